//! Backend REST client for the Trading Robot.
//!
//! Every call goes through [`ApiClient`], which:
//! - attaches the stored bearer token
//! - times each round trip
//! - retries transport failures (no server response) with exponential backoff
//! - unwraps the `{success, data, message, error}` envelope
//! - normalizes every failure into a [`ClientError`]
//!
//! Typed wrappers for the backend routers live in the endpoint modules.

pub mod accounts;
pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod market;
pub mod monitoring;
pub mod navigator;
pub mod settings;
pub mod strategies;
pub mod token;
pub mod trading;

pub use auth::{LoginResponse, UserProfile};
pub use client::{ApiClient, HttpConfig, RequestOptions, LOGIN_PATH};
pub use envelope::Envelope;
pub use error::{ClientError, ClientResult, ErrorCode, HttpError, HttpResult};
pub use monitoring::MonitoringAlert;
pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use strategies::{NewStrategy, StrategyStatusReport};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use trading::OrderFilter;
