//! Realtime push topics.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a server-pushed realtime event.
///
/// The backend only ever pushes these six kinds; anything else on the wire
/// is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    MarketData,
    News,
    WhaleAlert,
    OrderUpdate,
    StrategyUpdate,
    SystemStatus,
}

impl Topic {
    /// Every topic, in wire-declaration order.
    pub const ALL: [Topic; 6] = [
        Topic::MarketData,
        Topic::News,
        Topic::WhaleAlert,
        Topic::OrderUpdate,
        Topic::StrategyUpdate,
        Topic::SystemStatus,
    ];

    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::News => "news",
            Self::WhaleAlert => "whale_alert",
            Self::OrderUpdate => "order_update",
            Self::StrategyUpdate => "strategy_update",
            Self::SystemStatus => "system_status",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTopic(s.to_string()))
    }
}
