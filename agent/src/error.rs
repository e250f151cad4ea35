use msgs::{MessageId, MsgError};
use thiserror::Error;

use crate::agent::AgentState;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{message_id} is not expected while {state:?}")]
    ProtocolViolation { message_id: MessageId, state: AgentState },
    #[error("{action} requested while {state:?}")]
    UnexpectedAction { action: &'static str, state: AgentState },
    #[error(transparent)]
    MalformedMessage(#[from] MsgError),
}
