use msgs::{server_client_msg::RejectReason, MsgError};
use thiserror::Error;

use crate::host_mapping::ConnectionId;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection {0} is already registered")]
    DuplicateRegistration(ConnectionId),
    #[error("a game master is already registered")]
    GameMasterAlreadyRegistered,
    #[error("no host with id {0}")]
    UnknownHost(u32),
    #[error("host {0} is no longer reading its messages")]
    PeerGone(u32),
    #[error("no agent host ids left")]
    HostIdsExhausted,
    #[error(transparent)]
    Malformed(#[from] MsgError),
}

impl ConnectionError {
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ConnectionError::DuplicateRegistration(_) => RejectReason::DuplicateRegistration,
            ConnectionError::GameMasterAlreadyRegistered => RejectReason::GameMasterAlreadyRegistered,
            _ => RejectReason::Other,
        }
    }
}
