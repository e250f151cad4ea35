use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use chrono::{DateTime, Utc};
use msgs::{
    geometry::{BoardSize, Direction, Position, TeamId},
    payload::{
        ActionType, CheckShamResponse, DiscoverResponse, ExchangeInformationRequest,
        ExchangeInformationRequestForward, ExchangeInformationResponse, ExchangeInformationResponseForward,
        GoalInformation, JoinRequest, JoinResponse, MoveRequest, MoveResponse, PutDownPieceErrorSubtype,
        PutDownPieceResponse, PutDownPieceResult, StartGame,
    },
    Message, MessageId, MsgError, Payload,
};
use tokio::sync::mpsc;
use tracing::Span;

use crate::{
    board::{AgentBoard, AgentField},
    config::AgentConfig,
    error::AgentError,
    strategy::{Action, Strategy},
};

/// Ticks to wait for a response before the strategy is consulted anyway.
const MAX_SKIPPED_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Created,
    WaitingForJoin,
    WaitingForStart,
    InGame,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Continue,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldPiece {
    /// Checked and known to be genuine.
    pub is_discovered: bool,
}

/// Everything the agent has learned, as seen by its strategy.
#[derive(Debug, Clone)]
pub struct Knowledge {
    pub agent_id: u32,
    pub team: TeamId,
    pub is_leader: bool,
    pub leader_id: u32,
    pub position: Position,
    pub board: AgentBoard,
    pub teammates: Vec<u32>,
    /// Teammates that asked for information, oldest first.
    pub waiting_players: VecDeque<u32>,
    pub piece: Option<HeldPiece>,
    pub penalties: BTreeMap<ActionType, Duration>,
    pub sham_probability: f64,
}

impl Knowledge {
    fn new(team: TeamId) -> Knowledge {
        Knowledge {
            agent_id: 0,
            team,
            is_leader: false,
            leader_id: 0,
            position: Position::new(0, 0),
            board: AgentBoard::default(),
            teammates: Vec::new(),
            waiting_players: VecDeque::new(),
            piece: None,
            penalties: BTreeMap::new(),
            sham_probability: 0.0,
        }
    }

    pub fn penalty(&self, action: ActionType) -> Duration {
        self.penalties.get(&action).copied().unwrap_or_default()
    }

    pub fn current_field(&self) -> Option<&AgentField> {
        self.board.field(self.position)
    }

    pub fn in_own_goal_area(&self) -> bool {
        self.board.is_in_goal_area(self.team, self.position)
    }
}

/// Client side player. Inbound messages are injected, outbound requests
/// are pushed into `outbox`; `update` drives one tick.
pub struct Agent {
    config: AgentConfig,
    state: AgentState,
    paused: bool,
    knowledge: Knowledge,
    inbox: VecDeque<Message>,
    outbox: mpsc::UnboundedSender<Message>,
    strategy: Box<dyn Strategy>,
    remaining_penalty: Duration,
    awaiting_response: bool,
    skipped_ticks: u32,
    last_direction: Option<Direction>,
    next_teammate: usize,
    span: Span,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        strategy: Box<dyn Strategy>,
        outbox: mpsc::UnboundedSender<Message>,
        span: Span,
    ) -> Agent {
        Agent {
            knowledge: Knowledge::new(config.team_id),
            config,
            state: AgentState::Created,
            paused: false,
            inbox: VecDeque::new(),
            outbox,
            strategy,
            remaining_penalty: Duration::ZERO,
            awaiting_response: false,
            skipped_ticks: 0,
            last_direction: None,
            next_teammate: 0,
            span,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn remaining_penalty(&self) -> Duration {
        self.remaining_penalty
    }

    pub fn inject(&mut self, message: Message) {
        self.inbox.push_back(message);
    }

    pub fn update(&mut self, dt: Duration) -> ActionResult {
        self.update_at(dt, Utc::now())
    }

    pub fn update_at(&mut self, dt: Duration, now: DateTime<Utc>) -> ActionResult {
        let span = self.span.clone();
        let _entered = span.enter();

        if self.state == AgentState::Finished {
            return ActionResult::Finish;
        }
        self.remaining_penalty = self.remaining_penalty.saturating_sub(dt);

        if self.state == AgentState::InGame {
            let end_game = self.inbox.iter().position(|m| matches!(m.payload, Payload::EndGame (_)));
            if let Some(message) = end_game.and_then(|index| self.inbox.remove(index)) {
                return self.process_message(message, now);
            }
        }
        if self.state == AgentState::Created {
            return self.join();
        }
        if !self.remaining_penalty.is_zero() {
            return ActionResult::Continue;
        }
        if let Some(message) = self.inbox.pop_front() {
            return self.process_message(message, now);
        }
        if self.state != AgentState::InGame || self.paused {
            return ActionResult::Continue;
        }
        if self.awaiting_response && self.skipped_ticks < MAX_SKIPPED_TICKS {
            self.skipped_ticks += 1;
            return ActionResult::Continue;
        }
        self.awaiting_response = false;
        self.skipped_ticks = 0;

        let action = self.strategy.decide(&self.knowledge, now);
        self.perform(action)
    }

    pub fn perform(&mut self, action: Action) -> ActionResult {
        match action {
            Action::Move (direction) => self.move_to(direction),
            Action::PickUp => self.pick_up(),
            Action::Put => self.put(),
            Action::CheckSham => self.check_piece(),
            Action::Destroy => self.destroy_piece(),
            Action::Discover => self.discover(),
            Action::BegForInfo => self.beg_for_info(),
            Action::GiveInfo => self.give_info(),
            Action::Wait => ActionResult::Continue,
        }
    }

    fn join(&mut self) -> ActionResult {
        tracing::info!(team = ?self.config.team_id, leader = self.config.wants_to_be_leader, "joining");
        self.send(Payload::JoinRequest (JoinRequest {
            team_id: self.config.team_id,
            wants_to_be_leader: self.config.wants_to_be_leader,
        }));
        self.state = AgentState::WaitingForJoin;
        ActionResult::Continue
    }

    pub fn move_to(&mut self, direction: Direction) -> ActionResult {
        self.last_direction = Some(direction);
        self.request("move", ActionType::Move, Payload::MoveRequest (MoveRequest { direction }), true)
    }

    pub fn pick_up(&mut self) -> ActionResult {
        self.request("pick up", ActionType::PickUp, Payload::PickUpPieceRequest, true)
    }

    pub fn put(&mut self) -> ActionResult {
        self.request("put", ActionType::PutPiece, Payload::PutDownPieceRequest, true)
    }

    pub fn check_piece(&mut self) -> ActionResult {
        self.request("check piece", ActionType::CheckForSham, Payload::CheckShamRequest, true)
    }

    pub fn destroy_piece(&mut self) -> ActionResult {
        self.request("destroy piece", ActionType::DestroyPiece, Payload::DestroyPieceRequest, true)
    }

    pub fn discover(&mut self) -> ActionResult {
        self.request("discover", ActionType::Discovery, Payload::DiscoverRequest, true)
    }

    /// Asks the next teammate in round-robin order.
    pub fn beg_for_info(&mut self) -> ActionResult {
        if self.state != AgentState::InGame || self.knowledge.teammates.is_empty() {
            return self.reject_action("beg for info");
        }
        let index = self.next_teammate % self.knowledge.teammates.len();
        self.next_teammate = index + 1;
        let asked_agent_id = self.knowledge.teammates[index];
        self.request(
            "beg for info",
            ActionType::InformationExchange,
            Payload::ExchangeInformationRequest (ExchangeInformationRequest { asked_agent_id }),
            false,
        )
    }

    /// Answers the teammate that has waited longest.
    pub fn give_info(&mut self) -> ActionResult {
        if self.state != AgentState::InGame {
            return self.reject_action("give info");
        }
        let Some(respond_to_id) = self.knowledge.waiting_players.pop_front() else {
            return self.reject_action("give info");
        };
        let board = &self.knowledge.board;
        let payload = Payload::ExchangeInformationResponse (ExchangeInformationResponse {
            respond_to_id,
            distances: board.distances(),
            red_team_goal_area: board.goal_area(TeamId::Red),
            blue_team_goal_area: board.goal_area(TeamId::Blue),
        });
        self.request("give info", ActionType::InformationResponse, payload, false)
    }

    fn request(&mut self, action: &'static str, penalty: ActionType, payload: Payload, expects_response: bool) -> ActionResult {
        if self.state != AgentState::InGame {
            return self.reject_action(action);
        }
        tracing::debug!(action, position = %self.knowledge.position, "sending request");
        self.remaining_penalty += self.knowledge.penalty(penalty);
        if expects_response {
            self.awaiting_response = true;
            self.skipped_ticks = 0;
        }
        self.send(payload);
        ActionResult::Continue
    }

    fn reject_action(&mut self, action: &'static str) -> ActionResult {
        let error = AgentError::UnexpectedAction { action, state: self.state };
        if self.config.end_if_unexpected_action {
            tracing::error!("{error}");
            self.finish()
        } else {
            tracing::warn!("{error}");
            ActionResult::Continue
        }
    }

    fn send(&self, payload: Payload) {
        if self.outbox.send(Message::new(self.knowledge.agent_id, payload)).is_err() {
            tracing::warn!("outbox closed, request dropped");
        }
    }

    fn finish(&mut self) -> ActionResult {
        self.state = AgentState::Finished;
        ActionResult::Finish
    }

    fn expects(&self, message_id: MessageId) -> bool {
        match message_id {
            MessageId::JoinResponse => self.state == AgentState::WaitingForJoin,
            MessageId::StartGame => self.state == AgentState::WaitingForStart,
            MessageId::UndefinedError => self.state != AgentState::Created,
            id if id.is_agent_request() => false,
            _ => self.state == AgentState::InGame,
        }
    }

    fn unexpected_message(&mut self, message_id: MessageId) -> ActionResult {
        let error = AgentError::ProtocolViolation { message_id, state: self.state };
        if self.config.end_if_unexpected_message {
            tracing::error!("{error}");
            self.finish()
        } else {
            tracing::warn!("{error}");
            ActionResult::Continue
        }
    }

    fn process_message(&mut self, message: Message, now: DateTime<Utc>) -> ActionResult {
        let message_id = message.message_id();
        if !self.expects(message_id) {
            return self.unexpected_message(message_id);
        }
        tracing::debug!(%message_id, "processing");

        if message_id.is_error()
            || matches!(
                message_id,
                MessageId::MoveResponse
                    | MessageId::PickUpPieceResponse
                    | MessageId::PutDownPieceResponse
                    | MessageId::CheckShamResponse
                    | MessageId::DiscoverResponse
                    | MessageId::DestroyPieceResponse
            )
        {
            self.awaiting_response = false;
        }

        match message.payload {
            Payload::JoinResponse (response) => self.on_join_response(response),
            Payload::StartGame (start) => self.on_start_game(start),
            Payload::PauseGame => {
                self.paused = true;
                ActionResult::Continue
            }
            Payload::ResumeGame => {
                self.paused = false;
                ActionResult::Continue
            }
            Payload::EndGame (end) => {
                tracing::info!(winner = %end.winner, "game over");
                self.finish()
            }
            Payload::MoveResponse (response) => self.on_move_response(response, now),
            Payload::PickUpPieceResponse => self.on_pick_up_response(now),
            Payload::PutDownPieceResponse (response) => self.on_put_down_response(response, now),
            Payload::CheckShamResponse (response) => self.on_check_sham_response(response),
            Payload::DestroyPieceResponse => {
                self.knowledge.piece = None;
                ActionResult::Continue
            }
            Payload::DiscoverResponse (response) => self.on_discover_response(response, now),
            Payload::ExchangeInformationRequestForward (forward) => self.on_information_request(forward),
            Payload::ExchangeInformationResponseForward (forward) => self.on_information_response(forward, now),
            Payload::UndefinedError (error) => {
                tracing::warn!(position = ?error.position, holding_piece = ?error.holding_piece, "game master reported undefined error");
                ActionResult::Continue
            }
            Payload::MoveError (error) => {
                tracing::warn!(position = %error.position, "move rejected, resynchronizing position");
                self.knowledge.position = error.position;
                ActionResult::Continue
            }
            Payload::PickUpPieceError (error) => {
                tracing::debug!(subtype = ?error.error_subtype, "nothing to pick up");
                self.knowledge.board.record_distance(self.knowledge.position, None, now);
                ActionResult::Continue
            }
            Payload::PutDownPieceError (error) => {
                tracing::warn!(subtype = ?error.error_subtype, "put rejected");
                if error.error_subtype == PutDownPieceErrorSubtype::AgentNotHolding {
                    self.knowledge.piece = None;
                }
                ActionResult::Continue
            }
            Payload::IgnoredDelayError (error) => {
                tracing::debug!(delay = error.delay, "request arrived during penalty");
                self.remaining_penalty = Duration::from_millis(error.delay.into());
                ActionResult::Continue
            }
            _ => self.unexpected_message(message_id),
        }
    }

    fn on_join_response(&mut self, response: JoinResponse) -> ActionResult {
        if !response.accepted {
            tracing::info!("join rejected");
            return self.finish();
        }
        tracing::info!(agent_id = response.agent_id, "joined");
        self.knowledge.agent_id = response.agent_id;
        self.state = AgentState::WaitingForStart;
        ActionResult::Continue
    }

    fn on_start_game(&mut self, start: StartGame) -> ActionResult {
        let BoardSize { x: width, y: height } = start.board_size;
        if width == 0 || start.goal_area_size == 0 || start.goal_area_size.saturating_mul(2) >= height {
            return self.malformed_message(MsgError::malformed(format!(
                "board {width}x{height} cannot hold two goal areas of height {}",
                start.goal_area_size
            )));
        }
        if start.agent_id != self.knowledge.agent_id {
            tracing::warn!(expected = self.knowledge.agent_id, got = start.agent_id, "start game names another agent id");
        }
        let knowledge = &mut self.knowledge;
        knowledge.agent_id = start.agent_id;
        knowledge.team = start.team_id;
        knowledge.leader_id = start.leader_id;
        knowledge.is_leader = start.leader_id == start.agent_id;
        knowledge.position = start.position;
        knowledge.board = AgentBoard::new(start.board_size.x, start.board_size.y, start.goal_area_size);
        knowledge.teammates = start.allies_ids.into_iter().filter(|id| *id != start.agent_id).collect();
        knowledge.penalties = start
            .penalties
            .into_iter()
            .map(|(action, millis)| (action, Duration::from_millis(millis.into())))
            .collect();
        knowledge.sham_probability = start.sham_piece_probability;
        knowledge.piece = None;
        knowledge.waiting_players.clear();

        tracing::info!(position = %knowledge.position, leader = knowledge.is_leader, "game started");
        self.state = AgentState::InGame;
        ActionResult::Continue
    }

    fn on_move_response(&mut self, response: MoveResponse, now: DateTime<Utc>) -> ActionResult {
        self.knowledge.position = response.current_position;
        if response.made_move {
            self.knowledge.board.record_distance(response.current_position, response.closest_piece, now);
            if response.closest_piece == Some(0) && self.knowledge.piece.is_none() {
                return self.pick_up();
            }
        } else if let Some(direction) = self.last_direction {
            self.knowledge.board.record_denied_move(response.current_position.step(direction), now);
        }
        ActionResult::Continue
    }

    fn on_pick_up_response(&mut self, now: DateTime<Utc>) -> ActionResult {
        let distance = self.knowledge.current_field().and_then(|field| field.distance_to_piece);
        if distance == Some(0) {
            self.knowledge.piece = Some(HeldPiece { is_discovered: false });
            self.knowledge.board.record_distance(self.knowledge.position, None, now);
        } else {
            tracing::warn!(position = %self.knowledge.position, "pick up confirmed where no piece was known");
        }
        ActionResult::Continue
    }

    fn on_put_down_response(&mut self, response: PutDownPieceResponse, now: DateTime<Utc>) -> ActionResult {
        self.knowledge.piece = None;
        let position = self.knowledge.position;
        match response.result {
            PutDownPieceResult::NormalOnGoalField => self.knowledge.board.record_goal_info(position, GoalInformation::Goal),
            PutDownPieceResult::NormalOnNonGoalField => {
                self.knowledge.board.record_goal_info(position, GoalInformation::NoGoal)
            }
            PutDownPieceResult::ShamOnGoalArea => {}
            PutDownPieceResult::TaskField => self.knowledge.board.record_distance(position, Some(0), now),
        }
        ActionResult::Continue
    }

    fn on_check_sham_response(&mut self, response: CheckShamResponse) -> ActionResult {
        let Some(piece) = self.knowledge.piece.as_mut() else {
            tracing::warn!("sham check answered while holding nothing");
            return ActionResult::Continue;
        };
        if response.sham {
            return self.destroy_piece();
        }
        piece.is_discovered = true;
        ActionResult::Continue
    }

    fn on_discover_response(&mut self, response: DiscoverResponse, now: DateTime<Utc>) -> ActionResult {
        self.knowledge.board.apply_discovery(self.knowledge.position, &response.distances, now);
        ActionResult::Continue
    }

    fn on_information_request(&mut self, forward: ExchangeInformationRequestForward) -> ActionResult {
        if forward.team_id != self.knowledge.team {
            tracing::warn!(asking = forward.asking_agent_id, "information request from another team");
            return ActionResult::Continue;
        }
        if forward.leader {
            self.knowledge.waiting_players.push_front(forward.asking_agent_id);
            return self.give_info();
        }
        self.knowledge.waiting_players.push_back(forward.asking_agent_id);
        ActionResult::Continue
    }

    fn on_information_response(&mut self, forward: ExchangeInformationResponseForward, now: DateTime<Utc>) -> ActionResult {
        let merged = self.knowledge.board.merge_exchange(
            &forward.distances,
            &forward.red_team_goal_area,
            &forward.blue_team_goal_area,
            now,
        );
        match merged {
            Ok(()) => {
                tracing::debug!(responding = forward.responding_id, "merged teammate knowledge");
                ActionResult::Continue
            }
            Err(e) => self.malformed_message(e),
        }
    }

    fn malformed_message(&mut self, error: MsgError) -> ActionResult {
        let error = AgentError::from(error);
        if self.config.end_if_unexpected_message {
            tracing::error!("{error}");
            self.finish()
        } else {
            tracing::warn!("{error}");
            ActionResult::Continue
        }
    }
}
