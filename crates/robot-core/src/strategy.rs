//! Strategy types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime status of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    #[default]
    Stopped,
    Running,
    Paused,
    Error,
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A configured trading strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    /// Strategy kind, e.g. `grid_trading`, `dca`, `momentum`.
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: StrategyStatus,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub win_trades: u64,
    #[serde(default)]
    pub total_pnl: Decimal,
    #[serde(default)]
    pub max_drawdown: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Strategy {
    /// Fraction of winning trades, `None` before the first trade.
    pub fn win_rate(&self) -> Option<f64> {
        if self.total_trades == 0 {
            return None;
        }
        Some(self.win_trades as f64 / self.total_trades as f64)
    }
}

/// Partial strategy state pushed on the `strategy_update` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyUpdate {
    #[serde(alias = "strategy_id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<StrategyStatus>,
    #[serde(default)]
    pub total_trades: Option<u64>,
    #[serde(default)]
    pub win_trades: Option<u64>,
    #[serde(default)]
    pub total_pnl: Option<Decimal>,
    #[serde(default)]
    pub max_drawdown: Option<Decimal>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StrategyUpdate {
    /// Apply the present fields onto `strategy`.
    pub fn apply_to(&self, strategy: &mut Strategy) {
        if let Some(status) = self.status {
            strategy.status = status;
        }
        if let Some(total) = self.total_trades {
            strategy.total_trades = total;
        }
        if let Some(wins) = self.win_trades {
            strategy.win_trades = wins;
        }
        if let Some(pnl) = self.total_pnl {
            strategy.total_pnl = pnl;
        }
        if let Some(dd) = self.max_drawdown {
            strategy.max_drawdown = dd;
        }
    }
}
