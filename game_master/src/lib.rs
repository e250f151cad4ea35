//! Authoritative side of the match: lobby, board, arbiter and scoring.

pub mod agent_record;
pub mod board;
pub mod config;
pub mod console_cmd;
pub mod console_input;
pub mod error;
pub mod game_logic;
pub mod game_master;
pub mod lobby;
pub mod score;

pub use config::{GameMasterConfig, Penalties};
pub use error::{BoardError, GameMasterError};
pub use game_master::{GameMaster, GamePhase, GameSnapshot};
