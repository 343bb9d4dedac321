//! Market data, news and whale-alert types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One realtime price observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    /// Filled from the event frame when the payload omits it.
    #[serde(default)]
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub change_24h: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// 24h ticker summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: Decimal,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub change_24h: Option<Decimal>,
}

/// OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A price level `[price, amount]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel(pub Decimal, pub Decimal);

/// Order book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    #[serde(default)]
    pub bids: Vec<OrderBookLevel>,
    #[serde(default)]
    pub asks: Vec<OrderBookLevel>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|level| level.0)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|level| level.0)
    }
}

/// A news article relevant to the tracked markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Sentiment score in `[-1, 1]`.
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// A large on-chain transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleAlert {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub usd_value: Option<Decimal>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub exchange_from: Option<String>,
    #[serde(default)]
    pub exchange_to: Option<String>,
    /// `inflow`, `outflow` or `internal`.
    #[serde(default)]
    pub direction: Option<String>,
    /// `low`, `medium`, `high` or `critical`.
    #[serde(default)]
    pub significance: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WhaleAlert {
    /// High and critical alerts deserve a user notification.
    pub fn is_significant(&self) -> bool {
        matches!(self.significance.as_deref(), Some("high") | Some("critical"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_book_levels_decode_from_pairs() {
        let book: OrderBook = serde_json::from_value(serde_json::json!({
            "symbol": "ETH/USDT",
            "bids": [["2300.5", "1.2"], ["2300.0", "3"]],
            "asks": [[2301.0, 0.5]]
        }))
        .unwrap();

        assert_eq!(book.best_bid(), Some(dec!(2300.5)));
        assert_eq!(book.best_ask(), Some(dec!(2301.0)));
    }

    #[test]
    fn test_whale_significance() {
        let mut alert: WhaleAlert = serde_json::from_value(serde_json::json!({
            "currency": "BTC",
            "amount": "1500"
        }))
        .unwrap();
        assert!(!alert.is_significant());

        alert.significance = Some("critical".to_string());
        assert!(alert.is_significant());
    }
}
