//! Server response envelope.

use crate::error::{failure_message, ClientError, ClientResult, ErrorCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Generic fallback when a failed envelope names no reason.
const UNSPECIFIED_FAILURE: &str = "Request failed";

/// `{success, data?, message?, error?}` wrapper around every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope<serde_json::Value> {
    /// Unwrap into the payload, or fail with the envelope's reason.
    ///
    /// `status` is the HTTP status the envelope arrived with; it becomes the
    /// error code when `success` is false. A missing `data` decodes from
    /// `null`, so `()`, `Option<_>` and `IgnoredAny` payloads accept it.
    pub fn into_data<T: DeserializeOwned>(self, status: u16) -> ClientResult<T> {
        if !self.success {
            let body = serde_json::to_value(&self).unwrap_or_default();
            let message = failure_message(&body).unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string());
            return Err(ClientError::new(ErrorCode::Status(status), message).with_details(body));
        }

        let data = self.data.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| {
            ClientError::unknown(format!("Failed to decode response data: {e}"))
        })
    }
}
