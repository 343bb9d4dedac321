//! Application composition root.
//!
//! Owns the request client, the realtime connection and the stores, and
//! runs the console loop until Ctrl-C.

use crate::config::AppConfig;
use crate::error::AppResult;
use robot_http::{ApiClient, ClientError, FileTokenStore, Navigator, OrderFilter, LOGIN_PATH};
use robot_store::{RealtimeBinding, SettingsStore, Stores};
use robot_ws::{ConnectionManager, ConnectionState};
use robot_telemetry::Metrics;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Navigator for the headless console: a redirect to the login view raises
/// a flag the run loop acts on.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNavigator {
    relogin: Arc<AtomicBool>,
}

impl ConsoleNavigator {
    /// Returns true once per login redirect.
    pub fn take_relogin(&self) -> bool {
        self.relogin.swap(false, Ordering::SeqCst)
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str) {
        if path == LOGIN_PATH {
            warn!("Session expired, login required");
            self.relogin.store(true, Ordering::SeqCst);
        } else {
            info!(path, "Navigation requested");
        }
    }
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    api: ApiClient,
    realtime: ConnectionManager,
    stores: Stores,
    navigator: ConsoleNavigator,
    credentials: Option<Credentials>,
    binding: Option<RealtimeBinding>,
}

impl Application {
    /// Build every component. Nothing touches the network until `start()`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let tokens = Arc::new(FileTokenStore::open(&config.storage.token_path));
        let navigator = ConsoleNavigator::default();
        let api = ApiClient::new(
            config.api.clone().into(),
            tokens,
            Arc::new(navigator.clone()),
        )?;
        let realtime = ConnectionManager::new(config.realtime.clone().into());
        let stores = Stores::new(SettingsStore::open(&config.storage.settings_path));
        let binding = RealtimeBinding::attach(&realtime, &stores);

        info!(
            api = %config.api.base_url,
            realtime = %config.realtime.url,
            authenticated = api.is_authenticated(),
            "Application initialized"
        );

        Ok(Self {
            config,
            api,
            realtime,
            stores,
            navigator,
            credentials: None,
            binding: Some(binding),
        })
    }

    /// Log in with these credentials at start and after session expiry.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn realtime(&self) -> &ConnectionManager {
        &self.realtime
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Log in if needed, open the realtime channel and load initial state.
    ///
    /// A failed realtime handshake is logged and retried from the run loop.
    pub async fn start(&self) -> AppResult<()> {
        if let Some(credentials) = &self.credentials {
            self.login(credentials).await?;
        } else if !self.api.is_authenticated() {
            warn!("No stored session and no credentials; authenticated calls will fail");
        }

        if let Err(e) = self.realtime.connect().await {
            warn!(error = %e, "Realtime connect failed, will retry");
        }

        self.refresh().await;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> AppResult<()> {
        let session = self
            .api
            .login(&credentials.username, &credentials.password)
            .await?;
        info!(
            username = %credentials.username,
            expires_in = ?session.expires_in,
            "Logged in"
        );
        Ok(())
    }

    /// Fetch every store's initial state. Failures are logged per resource.
    /// Returns the number of resources that failed.
    pub async fn refresh(&self) -> usize {
        let count = self.config.console.feed_count;
        let mut failures = 0;

        self.stores.strategy.set_loading(true);
        match self.api.list_strategies().await {
            Ok(strategies) => self.stores.strategy.set_strategies(strategies),
            Err(e) => {
                self.stores.strategy.set_loading(false);
                failures += report("strategies", &e);
            }
        }
        match self.api.list_orders(OrderFilter::default()).await {
            Ok(orders) => self.stores.trading.set_orders(orders),
            Err(e) => failures += report("orders", &e),
        }
        match self.api.positions().await {
            Ok(positions) => self.stores.trading.set_positions(positions),
            Err(e) => failures += report("positions", &e),
        }
        match self.api.tickers().await {
            Ok(tickers) => self.stores.market.set_tickers(tickers),
            Err(e) => failures += report("tickers", &e),
        }
        match self.api.news(count).await {
            Ok(news) => self.stores.market.set_news(news),
            Err(e) => failures += report("news", &e),
        }
        match self.api.whale_alerts(count).await {
            Ok(alerts) => self.stores.market.set_whale_alerts(alerts),
            Err(e) => failures += report("whale_alerts", &e),
        }
        if let Some(account_id) = &self.config.console.account_id {
            match self.api.account_balances(account_id).await {
                Ok(balances) => self.stores.trading.set_balances(balances),
                Err(e) => failures += report("balances", &e),
            }
        }
        match self.api.system_health().await {
            Ok(health) => self.stores.system.set_health(health),
            Err(e) => failures += report("system_health", &e),
        }
        match self.api.settings().await {
            Ok(settings) => {
                if let Err(e) = self.stores.settings.replace(settings) {
                    warn!(error = %e, "Failed to persist server settings");
                }
            }
            Err(e) => failures += report("settings", &e),
        }

        debug!(failures, "Refresh complete");
        failures
    }

    /// Run the console loop until Ctrl-C, then shut down.
    pub async fn run(mut self) -> AppResult<()> {
        let mut status_interval = tokio::time::interval(self.config.status_interval());

        info!("Entering console loop");
        loop {
            tokio::select! {
                _ = status_interval.tick() => {
                    self.tick().await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown()
    }

    async fn tick(&self) {
        if self.navigator.take_relogin() {
            match &self.credentials {
                Some(credentials) => match self.login(credentials).await {
                    Ok(()) => {
                        self.refresh().await;
                    }
                    Err(e) => error!(error = %e, "Re-login failed"),
                },
                None => warn!("Session expired; restart with --username and --password"),
            }
        }

        if self.realtime.state() == ConnectionState::Disconnected {
            if let Err(e) = self.realtime.connect().await {
                warn!(error = %e, "Realtime still unavailable");
            }
        }

        self.log_status();
    }

    fn log_status(&self) {
        let stores = &self.stores;
        let health = stores
            .system
            .health()
            .map(|h| format!("{:?}", h.status).to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            realtime = %self.realtime.state(),
            strategies = stores.strategy.len(),
            running = stores.strategy.running_count(),
            open_orders = stores.trading.open_orders().len(),
            positions = stores.trading.positions().len(),
            unrealized_pnl = %stores.trading.total_unrealized_pnl(),
            news = stores.market.news().len(),
            unread = stores.system.unread_count(),
            health = %health,
            "Status"
        );
        for notification in stores.system.notifications().iter().filter(|n| !n.read) {
            info!(
                level = ?notification.level,
                title = %notification.title,
                message = %notification.message,
                "Notification"
            );
        }
        stores.system.mark_all_read();

        if let Err(e) = export_metrics(self.config.console.metrics_path.as_deref()) {
            warn!(error = %e, "Failed to export metrics");
        }
    }

    /// Detach the stores, close the realtime channel and save settings.
    pub fn shutdown(&mut self) -> AppResult<()> {
        if let Some(binding) = self.binding.take() {
            binding.detach();
        }
        self.realtime.disconnect();
        self.stores.settings.save()?;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Write the Prometheus snapshot to `path`, or log it when no path is set.
fn export_metrics(path: Option<&Path>) -> AppResult<()> {
    let snapshot = Metrics::render()?;
    let Some(path) = path else {
        debug!(metrics = %snapshot, "Metrics snapshot");
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, snapshot)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn report(resource: &str, error: &ClientError) -> usize {
    if error.is_auth_expired() {
        warn!(resource, "Fetch rejected, session expired");
    } else {
        warn!(resource, error = %error, "Fetch failed");
    }
    1
}
