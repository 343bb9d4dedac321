//! Application bootstrap against a mock backend.

use robot_console::config::{ApiSection, ConsoleSection, RealtimeSection, StorageSection};
use robot_console::{AppConfig, Application};
use robot_core::{HealthStatus, Theme};
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data}))
}

fn closed_ws_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}/ws")
}

fn app_config(api_url: &str, dir: &TempDir) -> AppConfig {
    AppConfig {
        api: ApiSection {
            base_url: api_url.to_string(),
            max_retries: 0,
            ..ApiSection::default()
        },
        realtime: RealtimeSection {
            url: closed_ws_url(),
            heartbeat_interval_ms: 0,
            handshake_timeout_ms: 1_000,
            ..RealtimeSection::default()
        },
        storage: StorageSection {
            token_path: dir.path().join("token.json"),
            settings_path: dir.path().join("settings.json"),
        },
        ..AppConfig::default()
    }
}

async fn mount_get(server: &MockServer, route: &str, data: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

async fn mount_backend(server: &MockServer) {
    mount_get(
        server,
        "/api/v1/strategies/",
        json!([
            {"id": "s1", "name": "grid", "type": "grid_trading", "status": "running"},
            {"id": "s2", "name": "dca", "type": "dca", "status": "stopped"}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/v1/trading/orders",
        json!([{
            "id": "o1", "symbol": "BTC/USDT", "side": "buy", "type": "limit",
            "amount": "0.1", "price": "40000", "status": "submitted"
        }]),
    )
    .await;
    mount_get(
        server,
        "/api/v1/trading/positions",
        json!([{"symbol": "BTC/USDT", "side": "long", "size": "0.1", "unrealized_pnl": "12.5"}]),
    )
    .await;
    mount_get(
        server,
        "/api/v1/market/tickers",
        json!([{"symbol": "BTC/USDT", "last": "41000"}]),
    )
    .await;
    mount_get(
        server,
        "/api/v1/data/news",
        json!([{"title": "newest", "source": "wire"}, {"title": "older", "source": "wire"}]),
    )
    .await;
    mount_get(server, "/api/v1/data/whale-alerts", json!([])).await;
    mount_get(
        server,
        "/api/v1/monitoring/system",
        json!({"status": "healthy"}),
    )
    .await;
    mount_get(server, "/api/v1/settings/", json!({"theme": "light"})).await;
}

#[tokio::test]
async fn test_refresh_fills_stores() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(app_config(&server.uri(), &dir)).unwrap();

    assert_eq!(app.refresh().await, 0);

    let stores = app.stores();
    assert_eq!(stores.strategy.len(), 2);
    assert_eq!(stores.strategy.running_count(), 1);
    assert!(!stores.strategy.is_loading());
    assert_eq!(stores.trading.open_orders().len(), 1);
    assert_eq!(stores.trading.positions().len(), 1);
    assert!(stores.market.ticker("BTC/USDT").is_some());
    let titles: Vec<String> = stores.market.news().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["newest", "older"]);
    assert_eq!(stores.system.health().unwrap().status, HealthStatus::Healthy);
    assert_eq!(stores.settings.settings().theme, Theme::Light);
    assert!(dir.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_refresh_fetches_balances_for_configured_account() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    mount_get(
        &server,
        "/api/v1/accounts/acc-1/balance",
        json!([{"currency": "USDT", "total": "1000", "available": "750", "frozen": "250"}]),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        console: ConsoleSection {
            account_id: Some("acc-1".to_string()),
            ..ConsoleSection::default()
        },
        ..app_config(&server.uri(), &dir)
    };
    let app = Application::new(config).unwrap();

    assert_eq!(app.refresh().await, 0);

    let usdt = app.stores().trading.balance("USDT").unwrap();
    assert_eq!(usdt.available, dec!(750));
    assert_eq!(usdt.frozen, dec!(250));
}

#[tokio::test]
async fn test_refresh_counts_failures_and_continues() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/v1/market/tickers", json!([{"symbol": "ETH/USDT", "last": "2300"}]))
        .await;
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(app_config(&server.uri(), &dir)).unwrap();

    // Every unmounted route answers 404.
    assert_eq!(app.refresh().await, 7);
    assert!(app.stores().market.ticker("ETH/USDT").is_some());
    assert!(!app.stores().strategy.is_loading());
}

#[tokio::test]
async fn test_start_logs_in_and_survives_realtime_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({"username": "trader", "password": "hunter2"})))
        .respond_with(ok(json!({"access_token": "tok-1", "token_type": "bearer"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/strategies/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(app_config(&server.uri(), &dir))
        .unwrap()
        .with_credentials("trader", "hunter2");

    assert_ok!(app.start().await);

    assert!(app.api().is_authenticated());
    assert!(!app.realtime().is_connected());
    assert!(!app.stores().system.is_connected());
    assert!(dir.path().join("token.json").exists());
}

#[tokio::test]
async fn test_stored_token_reused_on_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("token.json"),
        json!({"token": "persisted", "saved_at": "2024-05-01T00:00:00Z"}).to_string(),
    )
    .unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v1/strategies/"))
        .and(header("authorization", "Bearer persisted"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let app = Application::new(app_config(&server.uri(), &dir)).unwrap();
    assert!(app.api().is_authenticated());
    app.refresh().await;
}

#[tokio::test]
async fn test_expired_session_clears_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("token.json"),
        json!({"token": "stale", "saved_at": "2024-05-01T00:00:00Z"}).to_string(),
    )
    .unwrap();

    let mut app = Application::new(app_config(&server.uri(), &dir)).unwrap();
    assert_eq!(app.refresh().await, 8);

    assert!(!app.api().is_authenticated());
    assert!(!dir.path().join("token.json").exists());
    assert_ok!(app.shutdown());
}
