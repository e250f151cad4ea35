use std::collections::HashSet;

use msgs::{
    geometry::TeamId,
    payload::{JoinRequest, JoinResponse, UndefinedError},
    Message, Payload,
};

use crate::{agent_record::AgentRecord, board::Board, error::BoardError};

/// Pre-game join handling.
pub struct Lobby {
    banned: HashSet<u32>,
    roster: Vec<AgentRecord>,
    team_size: u32,
}

impl Lobby {
    pub fn new(team_size: u32) -> Lobby {
        Lobby {
            banned: HashSet::new(),
            roster: Vec::new(),
            team_size,
        }
    }

    /// Answers one message received while agents are connecting.
    ///
    /// Anything but a join request bans the sender. Failing to find a spawn
    /// field is returned as an error and ends the match.
    pub fn process_message(&mut self, board: &mut Board, message: Message) -> Result<Message, BoardError> {
        let agent_id = message.agent_id;
        tracing::info!(agent_id, message_id = %message.message_id(), "lobby received message");

        if self.banned.contains(&agent_id) {
            tracing::warn!(agent_id, "rejecting banned agent");
            return Ok(undefined_error(agent_id));
        }

        let Payload::JoinRequest (request) = message.payload else {
            tracing::warn!(agent_id, "banning agent for sending a non-join message while connecting");
            self.banned.insert(agent_id);
            return Ok(undefined_error(agent_id));
        };

        self.join(board, agent_id, request)
    }

    fn join(&mut self, board: &mut Board, agent_id: u32, request: JoinRequest) -> Result<Message, BoardError> {
        if self.roster.iter().any(|agent| agent.id == agent_id) {
            return Ok(join_response(agent_id, true));
        }

        if self.team_count(request.team_id) >= self.team_size as usize {
            tracing::warn!(agent_id, team = %request.team_id, "rejecting, team is full");
            return Ok(join_response(agent_id, false));
        }

        let is_leader = !self.has_leader(request.team_id);
        let position = board.random_position_for_agent(request.team_id)?;
        board.place_agent(agent_id, position)?;
        self.roster.push(AgentRecord::new(agent_id, request.team_id, is_leader, position));

        tracing::info!(agent_id, team = %request.team_id, %position, is_leader, "accepted");
        Ok(join_response(agent_id, true))
    }

    fn team_count(&self, team: TeamId) -> usize {
        self.roster.iter().filter(|agent| agent.team == team).count()
    }

    fn has_leader(&self, team: TeamId) -> bool {
        self.roster.iter().any(|agent| agent.team == team && agent.is_leader)
    }

    pub fn can_start_game(&self) -> bool {
        self.has_leader(TeamId::Blue) && self.has_leader(TeamId::Red)
    }

    pub fn roster(&self) -> &[AgentRecord] {
        &self.roster
    }

    pub fn flush(&mut self) -> Vec<AgentRecord> {
        tracing::info!(count = self.roster.len(), "flushing lobby");
        std::mem::take(&mut self.roster)
    }

    /// Forgets a disconnected agent and frees its spawn field.
    pub fn remove(&mut self, board: &mut Board, agent_id: u32) -> Option<AgentRecord> {
        let index = self.roster.iter().position(|agent| agent.id == agent_id)?;
        let agent = self.roster.remove(index);
        board.remove_agent(agent.position);
        Some(agent)
    }
}

fn join_response(agent_id: u32, accepted: bool) -> Message {
    Message::new(agent_id, Payload::JoinResponse (JoinResponse { accepted, agent_id }))
}

fn undefined_error(agent_id: u32) -> Message {
    Message::new(agent_id, Payload::UndefinedError (UndefinedError { position: None, holding_piece: None }))
}
