use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use msgs::{geometry::TeamId, Message, Payload};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::Span;

use crate::{
    agent_record::AgentRecord,
    board::{Board, FieldState},
    config::GameMasterConfig,
    error::GameMasterError,
    game_logic::{self, GameLogic},
    lobby::Lobby,
    score::{self, GameResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Configuration,
    ConnectingAgents,
    InGame,
    Paused,
    Summary,
    CriticalError,
}

/// Read-only view for a presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub board_width: u32,
    pub board_height: u32,
    pub pieces_in_circulation: u32,
    pub blue_goal_area: Vec<Vec<FieldState>>,
    pub red_goal_area: Vec<Vec<FieldState>>,
    pub blue_completed_goals: u32,
    pub red_completed_goals: u32,
    pub agents: Vec<AgentRecord>,
    pub queued_messages: usize,
    pub winner: Option<TeamId>,
    pub critical_error: Option<String>,
}

/// Owns the authoritative match state. Outgoing messages are pushed into
/// `outbox`, addressed by `Message::agent_id`.
pub struct GameMaster {
    config: GameMasterConfig,
    phase: GamePhase,
    board: Board,
    lobby: Lobby,
    game_logic: GameLogic,
    agents: BTreeMap<u32, AgentRecord>,
    inbox: VecDeque<Message>,
    outbox: mpsc::UnboundedSender<Message>,
    winner: Option<TeamId>,
    critical_error: Option<String>,
    span: Span,
}

impl GameMaster {
    pub fn new(config: GameMasterConfig, outbox: mpsc::UnboundedSender<Message>, span: Span) -> GameMaster {
        let board = Board::new(&config, rng_for(&config));
        GameMaster {
            lobby: Lobby::new(config.team_size),
            game_logic: GameLogic::new(config.penalties.clone(), config.end_if_unexpected_message),
            config,
            phase: GamePhase::Configuration,
            board,
            agents: BTreeMap::new(),
            inbox: VecDeque::new(),
            outbox,
            winner: None,
            critical_error: None,
            span,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn config(&self) -> &GameMasterConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn agents(&self) -> &BTreeMap<u32, AgentRecord> {
        &self.agents
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn critical_error(&self) -> Option<&str> {
        self.critical_error.as_deref()
    }

    fn expect_phase(&self, expected: GamePhase, operation: &'static str) -> Result<(), GameMasterError> {
        if self.phase != expected {
            return Err(GameMasterError::InvalidPhase { operation, phase: self.phase });
        }
        Ok(())
    }

    /// Replaces the configuration before it is applied.
    pub fn configure(&mut self, config: GameMasterConfig) -> Result<(), GameMasterError> {
        self.expect_phase(GamePhase::Configuration, "configure")?;
        self.config = config;
        Ok(())
    }

    /// Validates the configuration and opens the lobby.
    pub fn apply_configuration(&mut self) -> Result<(), GameMasterError> {
        let _enter = self.span.clone().entered();
        self.expect_phase(GamePhase::Configuration, "apply configuration")?;

        if let Err(e) = self.config.validate() {
            self.fail(&e);
            return Err(e);
        }

        self.board = Board::new(&self.config, rng_for(&self.config));
        self.lobby = Lobby::new(self.config.team_size);
        self.game_logic = GameLogic::new(self.config.penalties.clone(), self.config.end_if_unexpected_message);
        self.phase = GamePhase::ConnectingAgents;
        tracing::info!("configuration applied, accepting agents");
        Ok(())
    }

    pub fn can_start_game(&self) -> bool {
        self.phase == GamePhase::ConnectingAgents && self.lobby.can_start_game()
    }

    pub fn start_game(&mut self) -> Result<(), GameMasterError> {
        let _enter = self.span.clone().entered();
        self.expect_phase(GamePhase::ConnectingAgents, "start the game")?;
        if !self.lobby.can_start_game() {
            return Err(GameMasterError::CannotStartGame);
        }

        self.agents = self.lobby.flush().into_iter().map(|agent| (agent.id, agent)).collect();

        let prepared = self
            .board
            .generate_goals(self.config.number_of_goals)
            .and_then(|_| self.board.drop_pieces());
        if let Err(e) = prepared {
            let e = GameMasterError::from(e);
            self.fail(&e);
            return Err(e);
        }

        self.phase = GamePhase::InGame;
        tracing::info!(agents = self.agents.len(), "game started");
        for message in game_logic::start_game_messages(&self.board, &self.agents, &self.config) {
            self.send(message);
        }
        Ok(())
    }

    pub fn pause_game(&mut self) -> Result<(), GameMasterError> {
        let _enter = self.span.clone().entered();
        self.expect_phase(GamePhase::InGame, "pause")?;
        self.phase = GamePhase::Paused;
        tracing::info!("game paused");
        for message in game_logic::broadcast(&self.agents, Payload::PauseGame) {
            self.send(message);
        }
        Ok(())
    }

    pub fn resume_game(&mut self) -> Result<(), GameMasterError> {
        let _enter = self.span.clone().entered();
        self.expect_phase(GamePhase::Paused, "resume")?;
        self.phase = GamePhase::InGame;
        tracing::info!("game resumed");
        for message in game_logic::broadcast(&self.agents, Payload::ResumeGame) {
            self.send(message);
        }
        Ok(())
    }

    /// Queues a message for the next tick.
    pub fn receive(&mut self, message: Message) {
        match self.phase {
            GamePhase::ConnectingAgents | GamePhase::InGame | GamePhase::Paused => self.inbox.push_back(message),
            phase => {
                let _enter = self.span.enter();
                tracing::warn!(agent_id = message.agent_id, message_id = %message.message_id(), ?phase, "dropping message");
            }
        }
    }

    /// The relay reported that an agent's connection is gone.
    pub fn agent_disconnected(&mut self, agent_id: u32) {
        let _enter = self.span.clone().entered();
        if self.lobby.remove(&mut self.board, agent_id).is_some() {
            tracing::info!(agent_id, "agent left the lobby");
            return;
        }
        if let Some(agent) = self.agents.remove(&agent_id) {
            self.board.remove_agent(agent.position);
            if agent.piece.is_some() {
                self.board.remove_piece_and_drop_new();
            }
            self.inbox.retain(|message| message.agent_id != agent_id);
            tracing::info!(agent_id, "agent left the game");
        }
    }

    /// One game master tick.
    pub fn update(&mut self, dt: Duration) -> Result<(), GameMasterError> {
        let _enter = self.span.clone().entered();
        match self.phase {
            GamePhase::ConnectingAgents | GamePhase::InGame => {}
            _ => return Ok(()),
        }

        if self.phase == GamePhase::InGame {
            self.board.update(dt);
        }
        for agent in self.agents.values_mut() {
            agent.update(dt);
        }

        let batch = std::mem::take(&mut self.inbox);
        for message in batch {
            let result = match self.phase {
                GamePhase::ConnectingAgents => {
                    self.lobby.process_message(&mut self.board, message).map_err(GameMasterError::from)
                }
                GamePhase::InGame => self.game_logic.process_message(&mut self.board, &mut self.agents, message),
                _ => break,
            };
            match result {
                Ok(response) => self.send(response),
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            }
        }

        if self.phase == GamePhase::InGame {
            if let Some(winner) = score::game_result(&self.board, self.config.win_threshold).winner() {
                self.end_game(winner);
            }
        }
        Ok(())
    }

    fn end_game(&mut self, winner: TeamId) {
        self.phase = GamePhase::Summary;
        self.winner = Some(winner);
        self.inbox.clear();
        tracing::info!(%winner, "game over");
        for message in game_logic::end_game_messages(&self.agents, winner) {
            self.send(message);
        }
    }

    fn fail(&mut self, cause: &GameMasterError) {
        tracing::error!("critical error: {cause}");
        self.phase = GamePhase::CriticalError;
        self.critical_error = Some(cause.to_string());
        self.inbox.clear();
    }

    fn send(&self, message: Message) {
        if self.outbox.send(message).is_err() {
            tracing::warn!("outbox closed, message dropped");
        }
    }

    pub fn game_result(&self) -> GameResult {
        score::game_result(&self.board, self.config.win_threshold)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut agents = self.lobby.roster().to_vec();
        agents.extend(self.agents.values().cloned());
        GameSnapshot {
            phase: self.phase,
            board_width: self.board.width(),
            board_height: self.board.height(),
            pieces_in_circulation: self.board.pieces_in_circulation(),
            blue_goal_area: self.board.goal_states(TeamId::Blue),
            red_goal_area: self.board.goal_states(TeamId::Red),
            blue_completed_goals: self.board.completed_goals(TeamId::Blue),
            red_completed_goals: self.board.completed_goals(TeamId::Red),
            agents,
            queued_messages: self.inbox.len(),
            winner: self.winner,
            critical_error: self.critical_error.clone(),
        }
    }
}

fn rng_for(config: &GameMasterConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
