//! Core domain types for the Trading Robot client.
//!
//! This crate provides the types shared by the realtime and HTTP layers:
//! - `Topic`, `RealtimeEvent`: the push-event vocabulary of the backend
//! - Backend models (strategies, orders, market data, system health, settings)
//! - `backoff`: pure delay functions and the `Sleeper` scheduling seam

pub mod backoff;
pub mod error;
pub mod event;
pub mod market;
pub mod settings;
pub mod strategy;
pub mod system;
pub mod topic;
pub mod trading;

pub use backoff::{reconnect_delay, retry_delay, RecordingSleeper, Sleeper, TokioSleeper};
pub use error::{CoreError, Result};
pub use event::{RealtimeEvent, EPOCH_SECONDS_CUTOFF};
pub use market::{Kline, MarketTick, NewsItem, OrderBook, OrderBookLevel, Ticker, WhaleAlert};
pub use settings::{NotificationPreferences, Theme, UserSettings};
pub use strategy::{Strategy, StrategyStatus, StrategyUpdate};
pub use system::{ComponentHealth, HealthStatus, Notification, NotificationLevel, SystemHealth};
pub use topic::Topic;
pub use trading::{
    AccountBalance, Order, OrderRequest, OrderSide, OrderStatus, OrderType, Position,
    PositionSide, Trade,
};
