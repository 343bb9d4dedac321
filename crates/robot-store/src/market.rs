//! Market data: tick history, tickers, news and whale alerts.

use crate::feed::BoundedFeed;
use parking_lot::RwLock;
use robot_core::{MarketTick, NewsItem, Ticker, WhaleAlert};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Ticks kept per symbol.
pub const TICK_HISTORY_CAP: usize = 500;
/// News items kept.
pub const NEWS_CAP: usize = 100;
/// Whale alerts kept.
pub const WHALE_ALERT_CAP: usize = 50;

#[derive(Debug)]
struct MarketState {
    ticks: HashMap<String, BoundedFeed<MarketTick>>,
    tickers: HashMap<String, Ticker>,
    news: BoundedFeed<NewsItem>,
    whale_alerts: BoundedFeed<WhaleAlert>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            ticks: HashMap::new(),
            tickers: HashMap::new(),
            news: BoundedFeed::new(NEWS_CAP),
            whale_alerts: BoundedFeed::new(WHALE_ALERT_CAP),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketStore {
    state: Arc<RwLock<MarketState>>,
}

impl MarketStore {
    pub fn push_tick(&self, tick: MarketTick) {
        let mut state = self.state.write();
        state
            .ticks
            .entry(tick.symbol.clone())
            .or_insert_with(|| BoundedFeed::new(TICK_HISTORY_CAP))
            .push(tick);
    }

    /// Tick history for `symbol`, newest first.
    pub fn ticks(&self, symbol: &str) -> Vec<MarketTick> {
        self.state
            .read()
            .ticks
            .get(symbol)
            .map(BoundedFeed::to_vec)
            .unwrap_or_default()
    }

    /// Latest tick price, falling back to the last ticker snapshot.
    pub fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        let state = self.state.read();
        state
            .ticks
            .get(symbol)
            .and_then(BoundedFeed::latest)
            .map(|tick| tick.price)
            .or_else(|| state.tickers.get(symbol).map(|ticker| ticker.last))
    }

    pub fn set_tickers(&self, tickers: Vec<Ticker>) {
        let mut state = self.state.write();
        for ticker in tickers {
            state.tickers.insert(ticker.symbol.clone(), ticker);
        }
    }

    pub fn ticker(&self, symbol: &str) -> Option<Ticker> {
        self.state.read().tickers.get(symbol).cloned()
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        let mut tickers: Vec<Ticker> = self.state.read().tickers.values().cloned().collect();
        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        tickers
    }

    pub fn push_news(&self, item: NewsItem) {
        self.state.write().news.push(item);
    }

    /// Replace the news feed from a fetch returned newest first.
    pub fn set_news(&self, items: Vec<NewsItem>) {
        let mut state = self.state.write();
        state.news.clear();
        for item in items.into_iter().rev() {
            state.news.push(item);
        }
    }

    pub fn news(&self) -> Vec<NewsItem> {
        self.state.read().news.to_vec()
    }

    pub fn push_whale_alert(&self, alert: WhaleAlert) {
        self.state.write().whale_alerts.push(alert);
    }

    /// Replace the whale-alert feed from a fetch returned newest first.
    pub fn set_whale_alerts(&self, alerts: Vec<WhaleAlert>) {
        let mut state = self.state.write();
        state.whale_alerts.clear();
        for alert in alerts.into_iter().rev() {
            state.whale_alerts.push(alert);
        }
    }

    pub fn whale_alerts(&self) -> Vec<WhaleAlert> {
        self.state.read().whale_alerts.to_vec()
    }
}
