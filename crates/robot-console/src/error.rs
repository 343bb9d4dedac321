//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] robot_http::HttpError),

    #[error("Request failed: {0}")]
    Request(#[from] robot_http::ClientError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] robot_ws::WsError),

    #[error("Store error: {0}")]
    Store(#[from] robot_store::StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] robot_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
