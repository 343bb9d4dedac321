//! HTTP layer error types.
//!
//! [`HttpError`] covers construction and local storage failures.
//! [`ClientError`] is the single normalized shape every API call fails with.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Construction and token-storage errors.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP client build failed: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Token storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token storage JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HttpResult<T> = Result<T, HttpError>;

/// Normalized failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The server responded; carries the HTTP status.
    Status(u16),
    /// Transport failure, no server response.
    Network,
    /// Anything else (undecodable body, local failure).
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "{status}"),
            Self::Network => f.write_str("NETWORK_ERROR"),
            Self::Unknown => f.write_str("UNKNOWN_ERROR"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Status(status) => serializer.serialize_u16(*status),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// Uniform `{code, message, details}` error returned by every API call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({code})")]
pub struct ClientError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ClientError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Server responded with `status`; message taken from the body when it has one.
    pub fn from_status(status: u16, body: Option<&serde_json::Value>) -> Self {
        let message = body
            .and_then(failure_message)
            .unwrap_or_else(|| default_status_message(status));
        let error = Self::new(ErrorCode::Status(status), message);
        match body {
            Some(body) => error.with_details(body.clone()),
            None => error,
        }
    }

    /// Transport failure with no server response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// HTTP status, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self.code {
            ErrorCode::Status(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.code == ErrorCode::Network
    }

    pub fn is_auth_expired(&self) -> bool {
        self.code == ErrorCode::Status(401)
    }
}

impl Serialize for ClientError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClientError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("details", &self.details)?;
        state.end()
    }
}

/// Failure text carried by a response body: envelope `message`, then
/// envelope `error`, then the framework's `detail`.
pub(crate) fn failure_message(body: &serde_json::Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| match value {
            serde_json::Value::String(text) if !text.is_empty() => Some(text.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        })
}

fn default_status_message(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|reason| format!("Request failed: {reason}"))
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::Status(404).to_string(), "404");
        assert_eq!(ErrorCode::Network.to_string(), "NETWORK_ERROR");
        assert_eq!(ErrorCode::Unknown.to_string(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_serialized_shape() {
        let err = ClientError::network("connection refused");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"code": "NETWORK_ERROR", "message": "connection refused", "details": null})
        );

        let value = serde_json::to_value(ClientError::from_status(503, None)).unwrap();
        assert_eq!(value["code"], 503);
    }

    #[test]
    fn test_from_status_prefers_envelope_message() {
        let body = json!({"success": false, "message": "symbol halted", "error": "E_HALT"});
        let err = ClientError::from_status(400, Some(&body));
        assert_eq!(err.message, "symbol halted");
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.details, Some(body));
    }

    #[test]
    fn test_from_status_falls_back_to_error_then_detail() {
        let err = ClientError::from_status(400, Some(&json!({"error": "bad side"})));
        assert_eq!(err.message, "bad side");

        let err = ClientError::from_status(422, Some(&json!({"detail": "field required"})));
        assert_eq!(err.message, "field required");
    }

    #[test]
    fn test_from_status_without_body_uses_reason() {
        let err = ClientError::from_status(502, None);
        assert_eq!(err.message, "Request failed: Bad Gateway");
    }

    #[test]
    fn test_auth_expired() {
        assert!(ClientError::from_status(401, None).is_auth_expired());
        assert!(!ClientError::from_status(403, None).is_auth_expired());
        assert!(ClientError::network("x").is_network());
    }
}
