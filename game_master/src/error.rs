use msgs::{
    geometry::{Position, TeamId},
    MessageId,
};
use thiserror::Error;

use crate::game_master::GamePhase;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("could not place goal {goal} after {attempts} attempts")]
    GoalPlacement { goal: u32, attempts: u32 },
    #[error("no free field for a {team} agent after {attempts} attempts")]
    AgentPlacement { team: TeamId, attempts: u32 },
    #[error("no free task field for a piece after {attempts} attempts")]
    PiecePlacement { attempts: u32 },
    #[error("field {0} is occupied")]
    Occupied(Position),
    #[error("field {0} is off the board")]
    OffBoard(Position),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameMasterError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("cannot {operation} while {phase:?}")]
    InvalidPhase { operation: &'static str, phase: GamePhase },
    #[error("both teams need a leader before the game can start")]
    CannotStartGame,
    #[error("agent {agent_id} sent {message_id}, which is not an in-game request from a joined agent")]
    ProtocolViolation { agent_id: u32, message_id: MessageId },
    #[error(transparent)]
    Board(#[from] BoardError),
}
