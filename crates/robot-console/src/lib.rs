//! Headless Trading Robot console.
//!
//! Composition root that wires the client layers together:
//! - Request client with a file-backed token
//! - Realtime connection bound to the client state stores
//! - Periodic status logging of the stores

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, ConsoleNavigator};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
