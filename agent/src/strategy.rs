use chrono::{DateTime, Utc};
use msgs::geometry::Direction;

use crate::agent::Knowledge;

/// Next step chosen by a strategy. The agent turns it into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    PickUp,
    Put,
    CheckSham,
    Destroy,
    Discover,
    BegForInfo,
    GiveInfo,
    Wait,
}

pub trait Strategy: Send {
    fn decide(&mut self, knowledge: &Knowledge, now: DateTime<Utc>) -> Action;
}

/// Keeps the agent connected without acting.
#[derive(Debug, Default)]
pub struct DoNothingStrategy;

impl Strategy for DoNothingStrategy {
    fn decide(&mut self, _knowledge: &Knowledge, _now: DateTime<Utc>) -> Action {
        Action::Wait
    }
}
