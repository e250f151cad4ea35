//! Player side of the match: a tick-driven state machine that keeps its own
//! view of the board and asks a [`Strategy`] what to do next.

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod simple_strategy;
pub mod strategy;

pub use agent::{ActionResult, Agent, AgentState, HeldPiece, Knowledge};
pub use config::{AgentConfig, StrategyKind};
pub use error::AgentError;
pub use simple_strategy::SimpleStrategy;
pub use strategy::{Action, DoNothingStrategy, Strategy};

pub fn strategy_for(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Simple => Box::new(SimpleStrategy::new()),
        StrategyKind::DoNothing => Box::new(DoNothingStrategy),
    }
}
