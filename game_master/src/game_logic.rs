use std::collections::BTreeMap;

use msgs::{
    geometry::{BoardSize, TeamId},
    payload::*,
    Message, MessageId, Payload,
};

use crate::{
    agent_record::AgentRecord,
    board::{Board, FieldState},
    config::{GameMasterConfig, Penalties},
    error::GameMasterError,
};

/// In-game arbiter. Every request yields exactly one outgoing message: a
/// response or error for the sender, or a forward to a teammate.
///
/// Messages from unknown senders and messages that are not requests are
/// answered with `UndefinedError`, or refused with
/// [`GameMasterError::ProtocolViolation`] when `end_if_unexpected_message`
/// is set.
pub struct GameLogic {
    penalties: Penalties,
    end_if_unexpected_message: bool,
}

impl GameLogic {
    pub fn new(penalties: Penalties, end_if_unexpected_message: bool) -> GameLogic {
        GameLogic { penalties, end_if_unexpected_message }
    }

    pub fn process_message(
        &self,
        board: &mut Board,
        agents: &mut BTreeMap<u32, AgentRecord>,
        message: Message,
    ) -> Result<Message, GameMasterError> {
        let agent_id = message.agent_id;
        let message_id = message.message_id();

        let Some(sender) = agents.get(&agent_id).cloned() else {
            tracing::warn!(agent_id, %message_id, "message from an agent that is not in the game");
            self.check_tolerated(agent_id, message_id)?;
            return Ok(Message::new(agent_id, Payload::UndefinedError (UndefinedError { position: None, holding_piece: None })));
        };

        let Some(action) = action_type(&message.payload) else {
            tracing::warn!(agent_id, %message_id, "message is not an in-game request");
            self.check_tolerated(agent_id, message_id)?;
            return Ok(undefined_error(&sender));
        };

        Ok(self.arbitrate(board, agents, sender, action, message))
    }

    fn check_tolerated(&self, agent_id: u32, message_id: MessageId) -> Result<(), GameMasterError> {
        if self.end_if_unexpected_message {
            return Err(GameMasterError::ProtocolViolation { agent_id, message_id });
        }
        Ok(())
    }

    fn arbitrate(
        &self,
        board: &mut Board,
        agents: &mut BTreeMap<u32, AgentRecord>,
        sender: AgentRecord,
        action: ActionType,
        message: Message,
    ) -> Message {
        let agent_id = sender.id;
        let message_id = message.message_id();

        if sender.is_penalized() {
            let delay = sender.remaining_penalty.as_millis().min(u32::MAX as u128) as u32;
            tracing::debug!(agent_id, %message_id, delay, "request arrived during penalty");
            return Message::new(agent_id, Payload::IgnoredDelayError (IgnoredDelayError { delay }));
        }

        let response = match message.payload {
            Payload::MoveRequest (request) => {
                let Some(agent) = agents.get_mut(&agent_id) else { return undefined_error(&sender) };
                move_agent(board, agent, request.direction)
            }
            Payload::PickUpPieceRequest => {
                let Some(agent) = agents.get_mut(&agent_id) else { return undefined_error(&sender) };
                pick_up(board, agent)
            }
            Payload::PutDownPieceRequest => {
                let Some(agent) = agents.get_mut(&agent_id) else { return undefined_error(&sender) };
                put_down(board, agent)
            }
            Payload::CheckShamRequest => match sender.piece {
                Some(piece) => Message::new(agent_id, Payload::CheckShamResponse (CheckShamResponse { sham: piece.is_sham })),
                None => undefined_error(&sender),
            },
            Payload::DestroyPieceRequest => {
                let Some(agent) = agents.get_mut(&agent_id) else { return undefined_error(&sender) };
                match agent.piece.take() {
                    Some(_) => {
                        board.remove_piece_and_drop_new();
                        Message::new(agent_id, Payload::DestroyPieceResponse)
                    }
                    None => undefined_error(&sender),
                }
            }
            Payload::DiscoverRequest => {
                let distances = board.discover_array(sender.position);
                Message::new(agent_id, Payload::DiscoverResponse (DiscoverResponse { distances }))
            }
            Payload::ExchangeInformationRequest (request) => {
                match teammate(agents, &sender, request.asked_agent_id) {
                    Some(asked) => Message::new(
                        asked,
                        Payload::ExchangeInformationRequestForward (ExchangeInformationRequestForward {
                            asking_agent_id: agent_id,
                            leader: sender.is_leader,
                            team_id: sender.team,
                        }),
                    ),
                    None => undefined_error(&sender),
                }
            }
            Payload::ExchangeInformationResponse (response) => {
                let target = teammate(agents, &sender, response.respond_to_id);
                match target {
                    Some(target) if has_board_dimensions(board, &response) => Message::new(
                        target,
                        Payload::ExchangeInformationResponseForward (ExchangeInformationResponseForward {
                            responding_id: agent_id,
                            distances: response.distances,
                            red_team_goal_area: response.red_team_goal_area,
                            blue_team_goal_area: response.blue_team_goal_area,
                        }),
                    ),
                    _ => undefined_error(&sender),
                }
            }
            _ => undefined_error(&sender),
        };

        if let Some(agent) = agents.get_mut(&agent_id) {
            agent.apply_penalty(self.penalties.duration(action));
        }
        tracing::debug!(agent_id, request = %message_id, response = %response.message_id(), "arbitrated");
        response
    }
}

fn action_type(payload: &Payload) -> Option<ActionType> {
    let action = match payload {
        Payload::MoveRequest (_) => ActionType::Move,
        Payload::PickUpPieceRequest => ActionType::PickUp,
        Payload::PutDownPieceRequest => ActionType::PutPiece,
        Payload::CheckShamRequest => ActionType::CheckForSham,
        Payload::DestroyPieceRequest => ActionType::DestroyPiece,
        Payload::DiscoverRequest => ActionType::Discovery,
        Payload::ExchangeInformationRequest (_) => ActionType::InformationExchange,
        Payload::ExchangeInformationResponse (_) => ActionType::InformationResponse,
        _ => return None,
    };
    Some(action)
}

fn undefined_error(agent: &AgentRecord) -> Message {
    Message::new(
        agent.id,
        Payload::UndefinedError (UndefinedError {
            position: Some(agent.position),
            holding_piece: Some(agent.piece.is_some()),
        }),
    )
}

fn move_agent(board: &mut Board, agent: &mut AgentRecord, direction: msgs::geometry::Direction) -> Message {
    if board.field(agent.position).and_then(|field| field.agent) != Some(agent.id) {
        tracing::error!(agent_id = agent.id, position = %agent.position, "agent is not where the board says");
        return Message::new(agent.id, Payload::MoveError (MoveError { position: agent.position }));
    }

    let response = match board.move_agent(agent.team, agent.position, direction) {
        Some(position) => {
            agent.position = position;
            MoveResponse {
                made_move: true,
                current_position: position,
                closest_piece: board.distance_to_nearest_piece(position),
            }
        }
        None => MoveResponse {
            made_move: false,
            current_position: agent.position,
            closest_piece: None,
        },
    };
    Message::new(agent.id, Payload::MoveResponse (response))
}

fn pick_up(board: &mut Board, agent: &mut AgentRecord) -> Message {
    if agent.piece.is_some() {
        return Message::new(agent.id, Payload::PickUpPieceError (PickUpPieceError { error_subtype: PickUpPieceErrorSubtype::Other }));
    }
    match board.take_piece(agent.position) {
        Some(piece) => {
            agent.piece = Some(piece);
            Message::new(agent.id, Payload::PickUpPieceResponse)
        }
        None => Message::new(agent.id, Payload::PickUpPieceError (PickUpPieceError { error_subtype: PickUpPieceErrorSubtype::NothingThere })),
    }
}

fn put_down(board: &mut Board, agent: &mut AgentRecord) -> Message {
    let Some(piece) = agent.piece else {
        return put_error(agent.id, PutDownPieceErrorSubtype::AgentNotHolding);
    };
    let position = agent.position;
    let owner = board.goal_area_owner(position);

    let result = if owner == Some(agent.team) {
        let result = if piece.is_sham {
            PutDownPieceResult::ShamOnGoalArea
        } else {
            match board.field(position).map(|field| field.state) {
                Some(FieldState::Goal) => {
                    if board.set_state(position, FieldState::CompletedGoal).is_err() {
                        return put_error(agent.id, PutDownPieceErrorSubtype::Other);
                    }
                    PutDownPieceResult::NormalOnGoalField
                }
                Some(FieldState::CompletedGoal) => PutDownPieceResult::NormalOnNonGoalField,
                _ => {
                    if board.set_state(position, FieldState::NoGoal).is_err() {
                        return put_error(agent.id, PutDownPieceErrorSubtype::Other);
                    }
                    PutDownPieceResult::NormalOnNonGoalField
                }
            }
        };
        board.remove_piece_and_drop_new();
        result
    } else if owner.is_none() {
        if board.push_piece(position, piece).is_err() || board.set_state(position, FieldState::NoGoal).is_err() {
            return put_error(agent.id, PutDownPieceErrorSubtype::Other);
        }
        PutDownPieceResult::TaskField
    } else {
        return put_error(agent.id, PutDownPieceErrorSubtype::CannotPutThere);
    };

    agent.piece = None;
    tracing::info!(agent_id = agent.id, %position, ?result, "piece put down");
    Message::new(agent.id, Payload::PutDownPieceResponse (PutDownPieceResponse { result }))
}

fn put_error(agent_id: u32, error_subtype: PutDownPieceErrorSubtype) -> Message {
    Message::new(agent_id, Payload::PutDownPieceError (PutDownPieceError { error_subtype }))
}

fn teammate(agents: &BTreeMap<u32, AgentRecord>, sender: &AgentRecord, id: u32) -> Option<u32> {
    agents
        .get(&id)
        .filter(|other| other.id != sender.id && other.team == sender.team)
        .map(|other| other.id)
}

fn has_board_dimensions(board: &Board, response: &ExchangeInformationResponse) -> bool {
    let (width, height, goal) = (board.width() as usize, board.height() as usize, board.goal_area_height() as usize);
    let fits = |matrix_height: usize, matrix_width: usize, expected_height: usize| matrix_height == expected_height && matrix_width == width;
    fits(response.distances.height(), response.distances.width(), height)
        && fits(response.red_team_goal_area.height(), response.red_team_goal_area.width(), goal)
        && fits(response.blue_team_goal_area.height(), response.blue_team_goal_area.width(), goal)
}

pub fn start_game_messages(board: &Board, agents: &BTreeMap<u32, AgentRecord>, config: &GameMasterConfig) -> Vec<Message> {
    let team_ids = |team: TeamId| agents.values().filter(move |a| a.team == team).map(|a| a.id);

    agents
        .values()
        .map(|agent| {
            let allies_ids = team_ids(agent.team).filter(|id| *id != agent.id).collect::<Vec<_>>();
            let enemies_ids = team_ids(agent.team.opposite()).collect::<Vec<_>>();
            let leader_id = agents
                .values()
                .find(|a| a.team == agent.team && a.is_leader)
                .map_or(agent.id, |a| a.id);

            Message::new(
                agent.id,
                Payload::StartGame (StartGame {
                    agent_id: agent.id,
                    number_of_players: NumberOfPlayers { allies: allies_ids.len() as u32, enemies: enemies_ids.len() as u32 },
                    allies_ids,
                    leader_id,
                    enemies_ids,
                    team_id: agent.team,
                    board_size: BoardSize { x: board.width(), y: board.height() },
                    goal_area_size: board.goal_area_height(),
                    number_of_pieces: config.number_of_pieces,
                    number_of_goals: config.number_of_goals,
                    penalties: config.penalties.as_table(),
                    sham_piece_probability: config.sham_probability,
                    position: agent.position,
                }),
            )
        })
        .collect()
}

pub fn broadcast(agents: &BTreeMap<u32, AgentRecord>, payload: Payload) -> Vec<Message> {
    agents.keys().map(|id| Message::new(*id, payload.clone())).collect()
}

pub fn end_game_messages(agents: &BTreeMap<u32, AgentRecord>, winner: TeamId) -> Vec<Message> {
    broadcast(agents, Payload::EndGame (EndGame { winner }))
}
