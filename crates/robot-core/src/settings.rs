//! User settings.

use serde::{Deserialize, Serialize};

/// Display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Which notifications the user wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub order_updates: bool,
    #[serde(default = "default_true")]
    pub strategy_updates: bool,
    #[serde(default = "default_true")]
    pub whale_alerts: bool,
    #[serde(default)]
    pub news: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            order_updates: true,
            strategy_updates: true,
            whale_alerts: true,
            news: false,
        }
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// Symbols shown on the dashboard.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
    #[serde(default)]
    pub notifications: NotificationPreferences,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_quote_currency() -> String {
    "USDT".to_string()
}

fn default_watchlist() -> Vec<String> {
    vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: default_language(),
            quote_currency: default_quote_currency(),
            watchlist: default_watchlist(),
            notifications: NotificationPreferences::default(),
        }
    }
}
