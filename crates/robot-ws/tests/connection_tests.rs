//! Connection lifecycle integration tests.
//!
//! Covers:
//! - Connect deduplication and failure reporting
//! - Event fan-out and outbound emit
//! - Reconnection, its ceiling and its cancellation
//! - Heartbeat timeout

mod common;

use common::mock_ws::MockWsServer;
use common::wait_until;
use futures_util::future::join_all;
use robot_core::{RealtimeEvent, RecordingSleeper, Topic};
use robot_ws::{
    ConnectionConfig, ConnectionManager, ConnectionState, EventCallback, ReconnectTrigger,
    WsError,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

fn config(url: String) -> ConnectionConfig {
    ConnectionConfig {
        url,
        heartbeat_interval_ms: 0,
        handshake_timeout_ms: 2_000,
        ..ConnectionConfig::default()
    }
}

fn manager(url: String) -> (ConnectionManager, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::with_sleeper(config(url), Arc::new(sleeper.clone()));
    (manager, sleeper)
}

fn counting_callback() -> (Arc<AtomicUsize>, EventCallback) {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let callback: EventCallback = Arc::new(move |_event: &RealtimeEvent| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    (hits, callback)
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}")
}

#[tokio::test]
async fn test_connect_assigns_identity() {
    let server = MockWsServer::start().await;
    let (manager, _sleeper) = manager(server.url());

    assert_ok!(manager.connect().await);

    assert!(manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.connection_id().is_some());
    assert_eq!(manager.reconnect_attempts(), 0);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_concurrent_connects_share_one_handshake() {
    let server = MockWsServer::start().await;
    let (manager, _sleeper) = manager(server.url());

    let results = join_all((0..5).map(|_| {
        let manager = manager.clone();
        async move { manager.connect().await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_ok!(manager.connect().await);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_connect_failure_is_returned_not_retried() {
    let (manager, sleeper) = manager(closed_port_url());

    let err = manager.connect().await.unwrap_err();

    assert!(matches!(err, WsError::ConnectionFailed(_)));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sleeper.count(), 0);
    assert_eq!(manager.reconnect_attempts(), 0);
}

#[tokio::test]
async fn test_handshake_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let _silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let manager = ConnectionManager::new(ConnectionConfig {
        handshake_timeout_ms: 200,
        ..config(url)
    });

    let err = manager.connect().await.unwrap_err();
    assert_eq!(err, WsError::HandshakeTimeout { timeout_ms: 200 });
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_abandoned_connect_still_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let _silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    let manager = ConnectionManager::new(ConnectionConfig {
        handshake_timeout_ms: 200,
        ..config(url)
    });

    let gave_up = tokio::time::timeout(Duration::from_millis(50), manager.connect()).await;
    assert!(gave_up.is_err());
    assert_eq!(manager.state(), ConnectionState::Connecting);

    assert!(wait_until(|| manager.state() == ConnectionState::Disconnected).await);

    // The slot is free again, so a later connect starts its own handshake.
    let err = manager.connect().await.unwrap_err();
    assert_eq!(err, WsError::HandshakeTimeout { timeout_ms: 200 });
}

#[tokio::test]
async fn test_events_fan_out_despite_panicking_subscriber() {
    let server = MockWsServer::start().await;
    let (manager, _sleeper) = manager(server.url());

    let (first, cb_first) = counting_callback();
    let (second, cb_second) = counting_callback();
    let _a = manager.subscribe(Topic::MarketData, cb_first);
    let _b = manager.subscribe_fn(Topic::MarketData, |_event| panic!("bad tick"));
    let _c = manager.subscribe(Topic::MarketData, cb_second);

    assert_ok!(manager.connect().await);
    let tick = json!({
        "type": "market_data",
        "symbol": "BTC/USDT",
        "timestamp": 1_700_000_000_000_i64,
        "data": {"price": "42000.5"}
    });
    server.push(tick.clone());
    assert!(wait_until(|| second.load(Ordering::SeqCst) == 1).await);

    server.push(tick);
    assert!(wait_until(|| second.load(Ordering::SeqCst) == 2).await);
    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert!(manager.is_connected());
}

#[tokio::test]
async fn test_unsubscribed_and_unknown_events_are_dropped() {
    let server = MockWsServer::start().await;
    let (manager, _sleeper) = manager(server.url());
    let (news, cb_news) = counting_callback();
    let subscription = manager.subscribe(Topic::News, cb_news);

    assert_ok!(manager.connect().await);
    server.push(json!({"type": "whale_alert", "timestamp": 1_700_000_000_000_i64, "data": {}}));
    server.push(json!({"type": "not_a_topic", "data": {}}));
    server.push(json!({"type": "news", "timestamp": "2024-05-01T12:00:00Z", "data": {}}));
    assert!(wait_until(|| news.load(Ordering::SeqCst) == 1).await);

    subscription.unsubscribe();
    assert_eq!(manager.subscriber_count(Topic::News), 0);
    server.push(json!({"type": "news", "data": {}}));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(news.load(Ordering::SeqCst), 1);
    assert!(manager.is_connected());
}

#[tokio::test]
async fn test_emit_reaches_server() {
    let server = MockWsServer::start().await;
    let (manager, _sleeper) = manager(server.url());
    assert!(!manager.emit("subscribe", json!({"symbols": ["BTC/USDT"]})));

    assert_ok!(manager.connect().await);
    assert!(manager.emit("subscribe", json!({"symbols": ["BTC/USDT"]})));

    assert!(wait_until(|| !server.received_messages().is_empty()).await);
    let sent: serde_json::Value = serde_json::from_str(&server.received_messages()[0]).unwrap();
    assert_eq!(sent, json!({"type": "subscribe", "data": {"symbols": ["BTC/USDT"]}}));
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let (manager, sleeper) = manager(server.url());
    let mut states = manager.state_changes();

    assert_ok!(manager.connect().await);
    let first_id = manager.connection_id();
    let _ = states.borrow_and_update();

    server.close_all();
    assert!(wait_until(|| server.connection_count() == 2 && manager.is_connected()).await);

    assert_eq!(manager.reconnect_attempts(), 0);
    assert_ne!(manager.connection_id(), first_id);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(1000)]);
    assert!(states.has_changed().unwrap());
}

#[tokio::test]
async fn test_reconnect_abandoned_after_ceiling() {
    let mut server = MockWsServer::start().await;
    let (manager, sleeper) = manager(server.url());
    assert_ok!(manager.connect().await);

    server.stop_accepting().await;
    server.close_all();

    assert!(
        wait_until(|| sleeper.count() == 5 && manager.state() == ConnectionState::Disconnected)
            .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(manager.reconnect_attempts(), 5);
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(4000),
            Duration::from_millis(8000),
            Duration::from_millis(16000),
        ]
    );
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_server_close_trigger_ignores_abrupt_drop() {
    let server = MockWsServer::start().await;
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::with_sleeper(
        ConnectionConfig {
            reconnect_trigger: ReconnectTrigger::ServerClose,
            ..config(server.url())
        },
        Arc::new(sleeper.clone()),
    );
    assert_ok!(manager.connect().await);

    server.drop_all();
    assert!(wait_until(|| manager.state() == ConnectionState::Disconnected).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sleeper.count(), 0);
    assert_eq!(server.connection_count(), 1);
    assert!(manager.connection_id().is_none());
}

#[tokio::test]
async fn test_disconnect_cancels_scheduled_reconnect() {
    let server = MockWsServer::start().await;
    let manager = ConnectionManager::new(ConnectionConfig {
        reconnect_base_delay_ms: 60_000,
        ..config(server.url())
    });
    assert_ok!(manager.connect().await);

    server.close_all();
    assert!(wait_until(|| manager.state() == ConnectionState::Reconnecting).await);
    assert_eq!(manager.reconnect_attempts(), 1);

    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.reconnect_attempts(), 0);
    assert!(!manager.emit("ping", json!({})));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_disconnect_then_connect_again() {
    let server = MockWsServer::start().await;
    let (manager, sleeper) = manager(server.url());
    assert_ok!(manager.connect().await);

    manager.disconnect();
    assert!(manager.connection_id().is_none());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sleeper.count(), 0);

    assert_ok!(manager.connect().await);
    assert!(manager.is_connected());
    assert_eq!(server.connection_count(), 2);
}

#[tokio::test]
async fn test_heartbeat_timeout_drops_session() {
    let server = MockWsServer::start().await;
    let manager = ConnectionManager::new(ConnectionConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_ms: 100,
        reconnect_trigger: ReconnectTrigger::ServerClose,
        ..config(server.url())
    });
    assert_ok!(manager.connect().await);

    server.stall_all();
    assert!(wait_until(|| manager.state() == ConnectionState::Disconnected).await);
    assert!(manager.connection_id().is_none());
}
