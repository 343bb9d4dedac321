//! Realtime connection manager.
//!
//! Owns the single WebSocket session: connect deduplication, the session
//! read/write loop with heartbeat, and backoff reconnection after drops.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatMonitor;
use crate::subscription::{EventCallback, SubscriberRegistry, Subscription};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use robot_core::{reconnect_delay, RealtimeEvent, Sleeper, TokioSleeper, Topic};
use robot_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingConnect = Shared<BoxFuture<'static, WsResult<()>>>;

/// Which session drops schedule a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectTrigger {
    /// Only a Close frame sent by the server.
    ServerClose,
    /// Every drop the client did not ask for.
    #[default]
    AnyDrop,
}

impl ReconnectTrigger {
    pub fn should_reconnect(self, reason: DropReason) -> bool {
        match (self, reason) {
            (_, DropReason::ClientRequested) => false,
            (Self::ServerClose, reason) => reason == DropReason::ServerClosed,
            (Self::AnyDrop, _) => true,
        }
    }
}

/// Why a live session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Close frame from the server.
    ServerClosed,
    /// Read or write error on the socket.
    TransportError,
    /// Stream ended without a Close frame.
    StreamEnded,
    /// Ping left unanswered past the heartbeat timeout.
    HeartbeatTimeout,
    /// `disconnect()` was called.
    ClientRequested,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerClosed => "server_closed",
            Self::TransportError => "transport_error",
            Self::StreamEnded => "stream_ended",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::ClientRequested => "client_requested",
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Reconnect ceiling; `0` disables reconnection.
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Upper bound on a single handshake.
    pub handshake_timeout_ms: u64,
    /// Idle time before a ping is sent; `0` disables the heartbeat.
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    pub heartbeat_timeout_ms: u64,
    pub reconnect_trigger: ReconnectTrigger,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            handshake_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 10_000,
            reconnect_trigger: ReconnectTrigger::default(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Caller,
    Reconnect,
}

struct Session {
    generation: u64,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

struct Inner {
    config: ConnectionConfig,
    sleeper: Arc<dyn Sleeper>,
    registry: Arc<SubscriberRegistry>,
    state: watch::Sender<ConnectionState>,
    connection_id: RwLock<Option<String>>,
    attempts: AtomicU32,
    pending: Mutex<Option<(u64, PendingConnect)>>,
    session: Mutex<Option<Session>>,
    reconnect: Mutex<Option<CancellationToken>>,
    /// Bumped by every `disconnect()`; work begun under an older epoch is discarded.
    epoch: AtomicU64,
    tickets: AtomicU64,
}

/// Realtime connection manager.
///
/// Cheap to clone; clones drive the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a manager whose backoff waits go through `sleeper`.
    pub fn with_sleeper(config: ConnectionConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                sleeper,
                registry: Arc::new(SubscriberRegistry::new()),
                state,
                connection_id: RwLock::new(None),
                attempts: AtomicU32::new(0),
                pending: Mutex::new(None),
                session: Mutex::new(None),
                reconnect: Mutex::new(None),
                epoch: AtomicU64::new(0),
                tickets: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Open the connection.
    ///
    /// Resolves immediately when already connected. Concurrent callers share
    /// one in-flight handshake and its outcome. A failed handshake is
    /// returned to the callers and not retried.
    pub async fn connect(&self) -> WsResult<()> {
        match self.inner.join_or_start(Origin::Caller) {
            Some(pending) => pending.await,
            None => Ok(()),
        }
    }

    /// Close the connection and cancel any scheduled reconnect. Idempotent.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let session = {
            let mut session = inner.session.lock();
            inner.epoch.fetch_add(1, Ordering::SeqCst);
            session.take()
        };
        if let Some(token) = inner.reconnect.lock().take() {
            token.cancel();
        }
        inner.pending.lock().take();
        *inner.connection_id.write() = None;
        inner.attempts.store(0, Ordering::SeqCst);
        inner.set_state(ConnectionState::Disconnected);

        match session {
            Some(session) => {
                session.cancel.cancel();
                Metrics::ws_disconnected();
                info!(url = %inner.config.url, "Realtime disconnected");
            }
            None => debug!("Disconnect requested with no live session"),
        }
    }

    /// Register `callback` for `topic`. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, topic: Topic, callback: EventCallback) -> Subscription {
        self.inner.registry.add(topic, callback.clone());
        debug!(
            topic = %topic,
            subscribers = self.inner.registry.count(topic),
            "Subscribed"
        );
        Subscription::new(topic, callback, &self.inner.registry)
    }

    pub fn subscribe_fn<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(callback))
    }

    /// Remove one registration of exactly this callback; no-op if absent.
    pub fn unsubscribe(&self, topic: Topic, callback: &EventCallback) {
        if self.inner.registry.remove(topic, callback) {
            debug!(topic = %topic, "Unsubscribed");
        }
    }

    /// Send `{"type": event, "data": payload}` on the live connection.
    ///
    /// When disconnected the event is dropped with a warning and `false` is
    /// returned.
    pub fn emit(&self, event: &str, payload: serde_json::Value) -> bool {
        let outbound = self
            .inner
            .session
            .lock()
            .as_ref()
            .map(|session| session.outbound.clone());

        let Some(outbound) = outbound else {
            warn!(event, "Not connected, outbound event dropped");
            return false;
        };

        let frame = serde_json::json!({ "type": event, "data": payload }).to_string();
        if outbound.send(Message::Text(frame)).is_err() {
            warn!(event, "Session closing, outbound event dropped");
            return false;
        }
        true
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Identity of the live session; `None` while disconnected.
    pub fn connection_id(&self) -> Option<String> {
        self.inner.connection_id.read().clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner.registry.count(topic)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

impl Inner {
    fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "Connection state changed");
            Metrics::ws_state_set(next.as_str());
        }
    }

    /// Join the in-flight connect or start one. `None` when already connected.
    fn join_or_start(self: &Arc<Self>, origin: Origin) -> Option<PendingConnect> {
        let mut pending = self.pending.lock();
        if self.is_connected() {
            return None;
        }
        if let Some((_, in_flight)) = pending.as_ref() {
            return Some(in_flight.clone());
        }

        // The handshake runs on its own task so it completes, and clears
        // `pending`, even when every caller drops its future.
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = tokio::spawn(Arc::clone(self).open(ticket, origin));
        let inner = Arc::clone(self);
        let attempt = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    inner.abandon(ticket, origin);
                    Err(WsError::ConnectionFailed(format!("connect task failed: {e}")))
                }
            }
        }
        .boxed()
        .shared();
        *pending = Some((ticket, attempt.clone()));
        Some(attempt)
    }

    fn pending_ticket(&self) -> Option<u64> {
        self.pending.lock().as_ref().map(|(ticket, _)| *ticket)
    }

    /// Clean up after a connect task that died before finishing.
    fn abandon(&self, ticket: u64, origin: Origin) {
        let mut pending = self.pending.lock();
        if matches!(pending.as_ref(), Some((current, _)) if *current == ticket) {
            *pending = None;
            if origin == Origin::Caller && !self.is_connected() {
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }

    async fn open(self: Arc<Self>, ticket: u64, origin: Origin) -> WsResult<()> {
        let epoch = {
            let _session = self.session.lock();
            let epoch = self.epoch.load(Ordering::SeqCst);
            if origin == Origin::Caller && self.pending_ticket() == Some(ticket) {
                self.set_state(ConnectionState::Connecting);
            }
            epoch
        };
        info!(url = %self.config.url, ?origin, "Connecting to realtime endpoint");

        let timeout_ms = self.config.handshake_timeout_ms;
        let handshake = connect_async_tls_with_config(self.config.url.as_str(), None, true, None);
        let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), handshake).await
        {
            Ok(Ok((stream, _response))) => self.start_session(stream, epoch),
            Ok(Err(e)) => Err(WsError::from(e)),
            Err(_) => Err(WsError::HandshakeTimeout { timeout_ms }),
        };

        let mut pending = self.pending.lock();
        let current = matches!(pending.as_ref(), Some((current, _)) if *current == ticket);
        if current {
            *pending = None;
        }
        if let Err(e) = &result {
            warn!(url = %self.config.url, error = %e, "Realtime connect failed");
            if origin == Origin::Caller && current && *e != WsError::Cancelled {
                self.set_state(ConnectionState::Disconnected);
            }
        }
        result
    }

    fn start_session(self: &Arc<Self>, stream: WsStream, epoch: u64) -> WsResult<()> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let generation = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let connection_id = Uuid::new_v4().to_string();

        {
            let mut session = self.session.lock();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return Err(WsError::Cancelled);
            }
            let replaced = session.replace(Session {
                generation,
                outbound: outbound_tx,
                cancel: cancel.clone(),
            });
            if let Some(stale) = replaced {
                stale.cancel.cancel();
            }
            *self.connection_id.write() = Some(connection_id.clone());
            self.attempts.store(0, Ordering::SeqCst);
            self.set_state(ConnectionState::Connected);
        }

        if let Some(token) = self.reconnect.lock().take() {
            token.cancel();
        }
        Metrics::ws_connected();
        info!(url = %self.config.url, connection_id = %connection_id, "Realtime connected");

        tokio::spawn(Arc::clone(self).run_session(stream, outbound_rx, cancel, generation));
        Ok(())
    }

    async fn run_session(
        self: Arc<Self>,
        stream: WsStream,
        mut outbound_rx: mpsc::UnboundedReceiver<Message>,
        cancel: CancellationToken,
        generation: u64,
    ) {
        let (mut write, mut read) = stream.split();
        let mut heartbeat = HeartbeatMonitor::new(
            self.config.heartbeat_interval_ms,
            self.config.heartbeat_timeout_ms,
        );

        let reason = loop {
            let check = tokio::time::sleep(heartbeat.check_delay());

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not sent");
                    }
                    break DropReason::ClientRequested;
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            heartbeat.record_activity();
                            self.deliver(&text);
                        }
                        Some(Ok(Message::Pong(_))) => heartbeat.record_pong(),
                        // tungstenite queues the pong reply itself
                        Some(Ok(Message::Ping(_))) => heartbeat.record_activity(),
                        Some(Ok(Message::Binary(_))) => {
                            heartbeat.record_activity();
                            debug!("Ignoring binary frame");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1005, String::new()));
                            warn!(code, %reason, "Realtime connection closed by server");
                            break DropReason::ServerClosed;
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "Realtime read error");
                            break DropReason::TransportError;
                        }
                        None => {
                            warn!("Realtime stream ended");
                            break DropReason::StreamEnded;
                        }
                    }
                }

                outbound = outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        break DropReason::ClientRequested;
                    };
                    if let Err(e) = write.send(message).await {
                        error!(error = %e, "Realtime write error");
                        break DropReason::TransportError;
                    }
                }

                _ = check, if heartbeat.enabled() => {
                    if heartbeat.is_timed_out() {
                        error!(
                            timeout_ms = self.config.heartbeat_timeout_ms,
                            "Heartbeat timeout"
                        );
                        break DropReason::HeartbeatTimeout;
                    }
                    if heartbeat.should_send_ping() {
                        if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                            error!(error = %e, "Heartbeat ping failed");
                            break DropReason::TransportError;
                        }
                        heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        };

        self.on_session_end(generation, reason);
    }

    fn deliver(&self, text: &str) {
        match RealtimeEvent::from_json(text) {
            Ok(event) => {
                Metrics::ws_event(event.topic.as_str());
                self.registry.dispatch(&event);
            }
            Err(e) => warn!(error = %e, "Discarding malformed realtime frame"),
        }
    }

    fn on_session_end(self: &Arc<Self>, generation: u64, reason: DropReason) {
        let epoch = {
            let mut session = self.session.lock();
            match session.as_ref() {
                Some(current) if current.generation == generation => *session = None,
                _ => {
                    debug!(reason = reason.as_str(), "Session already released");
                    return;
                }
            }
            self.epoch.load(Ordering::SeqCst)
        };

        *self.connection_id.write() = None;
        Metrics::ws_disconnected();
        self.set_state(ConnectionState::Disconnected);
        info!(reason = reason.as_str(), "Realtime session ended");

        if self.config.reconnect_trigger.should_reconnect(reason) {
            self.schedule_reconnect(reason, epoch);
        } else {
            info!(
                reason = reason.as_str(),
                trigger = ?self.config.reconnect_trigger,
                "Reconnect not scheduled"
            );
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, reason: DropReason, epoch: u64) {
        let token = CancellationToken::new();
        {
            let mut slot = self.reconnect.lock();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }
        Metrics::ws_reconnect(reason.as_str());
        tokio::spawn(Arc::clone(self).reconnect_loop(token));
    }

    async fn reconnect_loop(self: Arc<Self>, token: CancellationToken) {
        let max = self.config.max_reconnect_attempts;
        let base = Duration::from_millis(self.config.reconnect_base_delay_ms);

        loop {
            if token.is_cancelled() {
                return;
            }

            let attempt = self.attempts.load(Ordering::SeqCst);
            if attempt >= max {
                error!(attempts = attempt, max, "Reconnection abandoned");
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            let attempt = attempt + 1;
            self.attempts.store(attempt, Ordering::SeqCst);
            self.set_state(ConnectionState::Reconnecting);

            let delay = reconnect_delay(base, attempt);
            warn!(
                attempt,
                max,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            tokio::select! {
                () = token.cancelled() => {
                    debug!("Reconnect cancelled during backoff");
                    return;
                }
                () = self.sleeper.sleep(delay) => {}
            }
            if token.is_cancelled() {
                return;
            }

            let Some(pending) = self.join_or_start(Origin::Reconnect) else {
                return;
            };
            match pending.await {
                Ok(()) => {
                    info!(attempt, "Reconnected");
                    return;
                }
                Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }
}
