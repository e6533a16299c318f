use thiserror::Error;

use crate::core::snapshot::SnapshotId;

#[derive(Error, Debug)]
pub enum LocalnetError {
    #[error("Snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    #[error("Clock already set")]
    ClockAlreadySet,

    #[error("Clock is not set: connect the network before processing messages")]
    ClockNotSet,

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Account fetch error: {0}")]
    AccountFetch(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, LocalnetError>;

impl From<serde_json::Error> for LocalnetError {
    fn from(err: serde_json::Error) -> Self {
        LocalnetError::Config(err.to_string())
    }
}

impl From<hex::FromHexError> for LocalnetError {
    fn from(err: hex::FromHexError) -> Self {
        LocalnetError::Validation(format!("invalid hex: {}", err))
    }
}
