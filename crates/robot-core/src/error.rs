//! Error types for robot-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Payload decode error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
