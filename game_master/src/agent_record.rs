use std::time::Duration;

use msgs::geometry::{Position, TeamId};
use serde::Serialize;

use crate::board::Piece;

/// What the game master knows about one joined agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRecord {
    pub id: u32,
    pub team: TeamId,
    pub is_leader: bool,
    pub position: Position,
    pub piece: Option<Piece>,
    #[serde(skip)]
    pub remaining_penalty: Duration,
}

impl AgentRecord {
    pub fn new(id: u32, team: TeamId, is_leader: bool, position: Position) -> AgentRecord {
        AgentRecord {
            id,
            team,
            is_leader,
            position,
            piece: None,
            remaining_penalty: Duration::ZERO,
        }
    }

    pub fn update(&mut self, dt: Duration) {
        self.remaining_penalty = self.remaining_penalty.saturating_sub(dt);
    }

    pub fn apply_penalty(&mut self, penalty: Duration) {
        self.remaining_penalty += penalty;
    }

    pub fn is_penalized(&self) -> bool {
        !self.remaining_penalty.is_zero()
    }
}
