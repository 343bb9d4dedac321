//! Client-side state for the Trading Robot.
//!
//! Each store is a cheaply cloneable handle over shared state:
//! - `StrategyStore`: strategies, selection, realtime status updates
//! - `TradingStore`: orders, positions, balances
//! - `MarketStore`: tick history, tickers, news and whale-alert feeds
//! - `SystemStore`: connection liveness, system health, notifications
//! - `SettingsStore`: user settings, persisted as JSON
//!
//! Stores never touch the network. `RealtimeBinding` feeds them from the
//! realtime connection.

pub mod error;
pub mod feed;
pub mod market;
pub mod realtime;
pub mod settings;
pub mod strategy;
pub mod system;
pub mod trading;

pub use error::{StoreError, StoreResult};
pub use feed::BoundedFeed;
pub use market::{MarketStore, NEWS_CAP, TICK_HISTORY_CAP, WHALE_ALERT_CAP};
pub use realtime::{route_event, RealtimeBinding};
pub use settings::SettingsStore;
pub use strategy::StrategyStore;
pub use system::{SystemStore, NOTIFICATION_CAP};
pub use trading::{OrderChange, TradingStore, ORDER_HISTORY_CAP};

/// All stores of one client session.
#[derive(Debug, Clone)]
pub struct Stores {
    pub strategy: StrategyStore,
    pub trading: TradingStore,
    pub market: MarketStore,
    pub system: SystemStore,
    pub settings: SettingsStore,
}

impl Stores {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            strategy: StrategyStore::default(),
            trading: TradingStore::default(),
            market: MarketStore::default(),
            system: SystemStore::default(),
            settings,
        }
    }

    /// Stores with in-memory settings.
    pub fn in_memory() -> Self {
        Self::new(SettingsStore::in_memory())
    }
}
