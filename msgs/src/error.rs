use thiserror::Error;

#[derive(Debug, Error)]
pub enum MsgError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MsgError {
    pub fn malformed(reason: impl std::fmt::Display) -> MsgError {
        MsgError::MalformedMessage(reason.to_string())
    }
}
