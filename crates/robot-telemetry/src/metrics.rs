//! Prometheus metrics for the Trading Robot client.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught at first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, IntCounter,
    TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Realtime connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "robot_ws_connected",
        "Realtime connection state (1=connected)"
    )
    .unwrap()
});

/// Realtime state machine current state.
/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "robot_ws_state",
        "Realtime state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Scheduled reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "robot_ws_reconnect_total",
        "Scheduled realtime reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Realtime events delivered, by topic.
pub static WS_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "robot_ws_events_total",
        "Realtime events received",
        &["topic"]
    )
    .unwrap()
});

/// Subscriber callbacks that panicked during delivery.
pub static SUBSCRIBER_PANICS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "robot_subscriber_panics_total",
        "Subscriber callbacks that panicked during fan-out"
    )
    .unwrap()
});

/// HTTP request latency in milliseconds.
pub static HTTP_REQUEST_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "robot_http_request_duration_ms",
        "HTTP request round-trip time in milliseconds",
        &["method", "status"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// HTTP retries after transport failures.
pub static HTTP_RETRY_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "robot_http_retry_total",
        "HTTP requests retried after a transport failure",
        &["method"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record realtime connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record realtime disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Set the realtime state machine state.
    /// Only the active state is set to 1, all others to 0.
    pub fn ws_state_set(state: &str) {
        for s in &["disconnected", "connecting", "connected", "reconnecting"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a scheduled reconnection.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a received realtime event.
    pub fn ws_event(topic: &str) {
        WS_EVENTS_TOTAL.with_label_values(&[topic]).inc();
    }

    /// Record a panicking subscriber.
    pub fn subscriber_panic() {
        SUBSCRIBER_PANICS_TOTAL.inc();
    }

    /// Record HTTP request latency. `status` is the HTTP status or `network`.
    pub fn http_request(method: &str, status: &str, elapsed_ms: f64) {
        HTTP_REQUEST_DURATION_MS
            .with_label_values(&[method, status])
            .observe(elapsed_ms);
    }

    /// Record an HTTP retry.
    pub fn http_retry(method: &str) {
        HTTP_RETRY_TOTAL.with_label_values(&[method]).inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
    }
}
