//! Connection health monitoring.
//!
//! Tracks ping/pong timing and inbound activity for one session.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-session heartbeat state.
///
/// A ping is due when nothing has arrived for `interval`; the session is
/// dead when a ping stays unanswered for longer than `timeout`.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    last_ping: Option<Instant>,
    last_activity: Instant,
    waiting_for_pong: bool,
}

impl HeartbeatMonitor {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            last_ping: None,
            last_activity: Instant::now(),
            waiting_for_pong: false,
        }
    }

    /// Interval `0` turns the heartbeat off.
    pub fn enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
        self.waiting_for_pong = true;
    }

    pub fn record_pong(&mut self) {
        self.last_activity = Instant::now();
        self.waiting_for_pong = false;
        if let Some(ping) = self.last_ping {
            debug!(rtt_ms = ping.elapsed().as_millis() as u64, "Received pong");
        }
    }

    /// Any inbound frame counts as activity.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_timed_out(&self) -> bool {
        match (self.waiting_for_pong, self.last_ping) {
            (true, Some(ping)) => ping.elapsed() > self.timeout,
            _ => false,
        }
    }

    pub fn should_send_ping(&self) -> bool {
        !self.waiting_for_pong && self.last_activity.elapsed() >= self.interval
    }

    /// Delay until the next check.
    pub fn check_delay(&self) -> Duration {
        let half = self.interval / 2;
        if self.waiting_for_pong {
            half.min(self.timeout).max(Duration::from_millis(1))
        } else {
            half.max(Duration::from_millis(1))
        }
    }
}
