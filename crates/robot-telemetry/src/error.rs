//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or the filter was invalid.
    #[error("Failed to install log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to encode metrics: {0}")]
    MetricsEncode(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
