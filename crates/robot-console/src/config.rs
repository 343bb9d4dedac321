//! Application configuration.
//!
//! Loaded from an optional TOML file layered with `ROBOT__SECTION__KEY`
//! environment overrides.

use crate::error::{AppError, AppResult};
use robot_http::HttpConfig;
use robot_ws::{ConnectionConfig, ReconnectTrigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Used when neither `--config` nor `ROBOT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Whole-request timeout (ms). Default: 30,000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Retries after a transport failure. Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl From<ApiSection> for HttpConfig {
    fn from(section: ApiSection) -> Self {
        Self {
            base_url: section.base_url,
            api_prefix: section.api_prefix,
            timeout: Duration::from_millis(section.timeout_ms),
            connect_timeout: Duration::from_millis(section.connect_timeout_ms),
            max_retries: section.max_retries,
            retry_base_delay: Duration::from_millis(section.retry_base_delay_ms),
        }
    }
}

/// Realtime channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeSection {
    #[serde(default = "default_ws_url")]
    pub url: String,
    /// Reconnect attempts before giving up. 0 disables reconnection.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Ping interval (ms). 0 disables the heartbeat.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    #[serde(default)]
    pub reconnect_trigger: ReconnectTrigger,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            reconnect_trigger: ReconnectTrigger::default(),
        }
    }
}

impl From<RealtimeSection> for ConnectionConfig {
    fn from(section: RealtimeSection) -> Self {
        Self {
            url: section.url,
            max_reconnect_attempts: section.max_reconnect_attempts,
            reconnect_base_delay_ms: section.reconnect_base_delay_ms,
            handshake_timeout_ms: section.handshake_timeout_ms,
            heartbeat_interval_ms: section.heartbeat_interval_ms,
            heartbeat_timeout_ms: section.heartbeat_timeout_ms,
            reconnect_trigger: section.reconnect_trigger,
        }
    }
}

/// Client-side files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

fn default_token_path() -> PathBuf {
    PathBuf::from("data/token.json")
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("data/settings.json")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            settings_path: default_settings_path(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub realtime: RealtimeSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub console: ConsoleSection,
}

/// Console loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSection {
    /// Interval between status lines (s). Default: 30.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    /// Items requested per feed on refresh. Default: 20.
    #[serde(default = "default_feed_count")]
    pub feed_count: u32,
    /// Exchange account whose balances are fetched on refresh. Unset skips them.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Prometheus text file rewritten on every status tick. Unset logs the
    /// snapshot at debug instead.
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

fn default_status_interval_secs() -> u64 {
    30
}

fn default_feed_count() -> u32 {
    20
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            status_interval_secs: default_status_interval_secs(),
            feed_count: default_feed_count(),
            account_id: None,
            metrics_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; the default path
    /// is optional.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&str>,
        env: Option<HashMap<String, String>>,
    ) -> AppResult<Self> {
        let (file, required) = match path {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_PATH, false),
        };

        config::Config::builder()
            .add_source(
                config::File::with_name(file)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix("ROBOT")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| AppError::Config(format!("Failed to load config from {file}: {e}")))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.console.status_interval_secs.max(1))
    }
}
