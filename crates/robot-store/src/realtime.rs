//! Routing realtime events into the stores.
//!
//! Each topic has one store update function. `RealtimeBinding` subscribes
//! them on a `ConnectionManager` and mirrors its liveness into
//! `SystemStore`.

use crate::Stores;
use robot_core::{
    HealthStatus, MarketTick, NewsItem, NotificationLevel, Order, OrderStatus, RealtimeEvent,
    StrategyStatus, StrategyUpdate, SystemHealth, Topic, WhaleAlert,
};
use robot_ws::{ConnectionManager, ConnectionState, Subscription};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Apply one event to the stores. Malformed payloads are logged and skipped.
pub fn route_event(stores: &Stores, event: &RealtimeEvent) {
    match event.topic {
        Topic::MarketData => on_market_data(stores, event),
        Topic::News => on_news(stores, event),
        Topic::WhaleAlert => on_whale_alert(stores, event),
        Topic::OrderUpdate => on_order_update(stores, event),
        Topic::StrategyUpdate => on_strategy_update(stores, event),
        Topic::SystemStatus => on_system_status(stores, event),
    }
}

fn decode<T: DeserializeOwned>(event: &RealtimeEvent) -> Option<T> {
    match event.decode() {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(topic = %event.topic, error = %e, "Skipping malformed realtime payload");
            None
        }
    }
}

fn on_market_data(stores: &Stores, event: &RealtimeEvent) {
    let Some(mut tick) = decode::<MarketTick>(event) else {
        return;
    };
    if tick.symbol.is_empty() {
        match &event.symbol {
            Some(symbol) => tick.symbol = symbol.clone(),
            None => {
                warn!("Skipping market tick without symbol");
                return;
            }
        }
    }
    if tick.timestamp.is_none() {
        tick.timestamp = Some(event.timestamp);
    }
    stores.market.push_tick(tick);
}

fn on_news(stores: &Stores, event: &RealtimeEvent) {
    let Some(item) = decode::<NewsItem>(event) else {
        return;
    };
    if stores.settings.settings().notifications.news {
        stores
            .system
            .notify(NotificationLevel::Info, "News", item.title.clone());
    }
    stores.market.push_news(item);
}

fn on_whale_alert(stores: &Stores, event: &RealtimeEvent) {
    let Some(alert) = decode::<WhaleAlert>(event) else {
        return;
    };
    if stores.settings.settings().notifications.whale_alerts {
        let level = if alert.is_significant() {
            NotificationLevel::Warning
        } else {
            NotificationLevel::Info
        };
        let message = match &alert.usd_value {
            Some(usd) => format!("{} {} (${usd})", alert.amount, alert.currency),
            None => format!("{} {}", alert.amount, alert.currency),
        };
        stores.system.notify(level, "Whale alert", message);
    }
    stores.market.push_whale_alert(alert);
}

fn on_order_update(stores: &Stores, event: &RealtimeEvent) {
    let Some(order) = decode::<Order>(event) else {
        return;
    };
    if stores.settings.settings().notifications.order_updates {
        let level = match order.status {
            OrderStatus::Filled => NotificationLevel::Success,
            OrderStatus::Rejected => NotificationLevel::Error,
            _ => NotificationLevel::Info,
        };
        let message = format!(
            "{} {} {} {}",
            order.side, order.amount, order.symbol, order.status
        );
        stores.system.notify(level, "Order update", message);
    }
    let change = stores.trading.apply_order_update(order);
    debug!(?change, "Applied order update");
}

fn on_strategy_update(stores: &Stores, event: &RealtimeEvent) {
    let Some(update) = decode::<StrategyUpdate>(event) else {
        return;
    };
    if !stores.strategy.apply_update(&update) {
        return;
    }
    if let Some(message) = &update.message {
        if stores.settings.settings().notifications.strategy_updates {
            let level = match update.status {
                Some(StrategyStatus::Error) => NotificationLevel::Error,
                _ => NotificationLevel::Info,
            };
            stores
                .system
                .notify(level, "Strategy update", message.clone());
        }
    }
}

fn on_system_status(stores: &Stores, event: &RealtimeEvent) {
    let Some(health) = decode::<SystemHealth>(event) else {
        return;
    };
    if health.status == HealthStatus::Critical {
        let degraded = health.degraded_components().join(", ");
        stores
            .system
            .notify(NotificationLevel::Warning, "System critical", degraded);
    }
    stores.system.set_health(health);
}

/// Store subscriptions on one connection. Dropping the binding detaches
/// every subscription and stops the liveness watcher.
#[must_use = "dropping a RealtimeBinding detaches it immediately"]
pub struct RealtimeBinding {
    subscriptions: Vec<Subscription>,
    watcher: Option<JoinHandle<()>>,
}

impl RealtimeBinding {
    /// Subscribe every topic. The liveness watcher only runs when called
    /// inside a Tokio runtime.
    pub fn attach(manager: &ConnectionManager, stores: &Stores) -> Self {
        let subscriptions = Topic::ALL
            .iter()
            .map(|&topic| {
                let stores = stores.clone();
                manager.subscribe_fn(topic, move |event| route_event(&stores, event))
            })
            .collect();

        stores.system.set_connected(manager.is_connected());
        let watcher = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let mut states = manager.state_changes();
            let system = stores.system.clone();
            handle.spawn(async move {
                loop {
                    let connected = *states.borrow_and_update() == ConnectionState::Connected;
                    system.set_connected(connected);
                    if states.changed().await.is_err() {
                        break;
                    }
                }
            })
        });

        debug!(topics = Topic::ALL.len(), "Realtime binding attached");
        Self {
            subscriptions,
            watcher,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for RealtimeBinding {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robot_core::Strategy;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn event(topic: Topic, data: serde_json::Value) -> RealtimeEvent {
        RealtimeEvent::new(topic, None, data)
    }

    #[test]
    fn test_market_tick_takes_envelope_symbol() {
        let stores = Stores::in_memory();
        let tick = RealtimeEvent::new(
            Topic::MarketData,
            Some("BTC/USDT".to_string()),
            json!({"price": "42000.5"}),
        );

        route_event(&stores, &tick);

        let ticks = stores.market.ticks("BTC/USDT");
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].price, dec!(42000.5));
        assert_eq!(ticks[0].timestamp, Some(tick.timestamp));
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let stores = Stores::in_memory();
        route_event(&stores, &event(Topic::OrderUpdate, json!({"id": 5})));
        route_event(&stores, &event(Topic::MarketData, json!({"price": "1"})));

        assert!(stores.trading.orders().is_empty());
        assert!(stores.market.ticks("").is_empty());
        assert!(stores.system.notifications().is_empty());
    }

    #[test]
    fn test_order_update_notifies() {
        let stores = Stores::in_memory();
        route_event(
            &stores,
            &event(
                Topic::OrderUpdate,
                json!({
                    "id": "o-1",
                    "symbol": "ETH/USDT",
                    "side": "sell",
                    "type": "market",
                    "amount": "2",
                    "status": "filled"
                }),
            ),
        );

        assert_eq!(stores.trading.order("o-1").unwrap().status, OrderStatus::Filled);
        let notes = stores.system.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Success);
        assert_eq!(notes[0].message, "sell 2 ETH/USDT filled");
    }

    #[test]
    fn test_order_notifications_respect_preferences() {
        let stores = Stores::in_memory();
        stores
            .settings
            .update(|s| s.notifications.order_updates = false)
            .unwrap();
        route_event(
            &stores,
            &event(
                Topic::OrderUpdate,
                json!({
                    "id": "o-2",
                    "symbol": "BTC/USDT",
                    "side": "buy",
                    "type": "limit",
                    "amount": "0.1",
                    "price": "40000",
                    "status": "rejected"
                }),
            ),
        );

        assert!(stores.trading.order("o-2").is_some());
        assert!(stores.system.notifications().is_empty());
    }

    #[test]
    fn test_significant_whale_alert_warns() {
        let stores = Stores::in_memory();
        route_event(
            &stores,
            &event(
                Topic::WhaleAlert,
                json!({"currency": "BTC", "amount": "900", "significance": "high"}),
            ),
        );

        assert_eq!(stores.market.whale_alerts().len(), 1);
        let notes = stores.system.notifications();
        assert_eq!(notes[0].level, NotificationLevel::Warning);
        assert_eq!(notes[0].message, "900 BTC");
    }

    #[test]
    fn test_news_notification_off_by_default() {
        let stores = Stores::in_memory();
        route_event(
            &stores,
            &event(Topic::News, json!({"title": "ETF approved", "source": "wire"})),
        );
        assert_eq!(stores.market.news().len(), 1);
        assert!(stores.system.notifications().is_empty());
    }

    #[test]
    fn test_strategy_update_for_known_strategy() {
        let stores = Stores::in_memory();
        let strategy: Strategy = serde_json::from_value(json!({
            "id": "s-1",
            "name": "grid",
            "type": "grid_trading"
        }))
        .unwrap();
        stores.strategy.set_strategies(vec![strategy]);

        route_event(
            &stores,
            &event(
                Topic::StrategyUpdate,
                json!({"strategy_id": "s-1", "status": "error", "message": "exchange down"}),
            ),
        );
        route_event(
            &stores,
            &event(Topic::StrategyUpdate, json!({"id": "ghost", "message": "hi"})),
        );

        assert_eq!(stores.strategy.get("s-1").unwrap().status, StrategyStatus::Error);
        let notes = stores.system.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_critical_system_status() {
        let stores = Stores::in_memory();
        route_event(
            &stores,
            &event(
                Topic::SystemStatus,
                json!({"status": "critical", "components": {"redis": {"status": "critical"}}}),
            ),
        );

        assert_eq!(
            stores.system.health().unwrap().status,
            HealthStatus::Critical
        );
        assert_eq!(stores.system.notifications()[0].message, "redis");
    }

    #[test]
    fn test_attach_outside_runtime_subscribes_all_topics() {
        let manager = ConnectionManager::new(robot_ws::ConnectionConfig::default());
        let stores = Stores::in_memory();
        let binding = RealtimeBinding::attach(&manager, &stores);

        assert_eq!(binding.subscription_count(), Topic::ALL.len());
        assert_eq!(manager.subscriber_count(Topic::OrderUpdate), 1);

        binding.detach();
        assert_eq!(manager.subscriber_count(Topic::OrderUpdate), 0);
    }
}
