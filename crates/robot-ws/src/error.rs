//! WebSocket error types.

use thiserror::Error;

/// Errors surfaced by [`crate::ConnectionManager::connect`].
///
/// `Clone` because one handshake outcome is shared by every concurrent
/// `connect()` caller. Mid-session drops are not errors; they are reported
/// through the connection state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    #[error("Connect cancelled by disconnect")]
    Cancelled,
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionFailed(e.to_string())
    }
}

pub type WsResult<T> = Result<T, WsError>;
