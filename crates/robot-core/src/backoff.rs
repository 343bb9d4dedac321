//! Backoff delay functions and the scheduling seam.
//!
//! Both the reconnect loop and the request retry loop compute their waits
//! with the pure functions here and perform them through a [`Sleeper`], so
//! tests can observe the delay sequence without waiting on the wall clock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Largest exponent applied to a base delay.
const MAX_EXPONENT: u32 = 16;

/// Reconnect delay for the `attempt`-th scheduled retry (1-based).
///
/// `base * 2^(attempt-1)`: attempt 1 waits `base`, attempt 2 waits `2*base`.
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    base.saturating_mul(1u32 << exponent)
}

/// Request retry delay for the `attempt`-th retry (1-based).
///
/// `2^attempt * base`: with a one second base the sequence is 2s, 4s, 8s.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(MAX_EXPONENT))
}

/// Performs backoff waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and records every requested delay.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.delays.lock().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
        tokio::task::yield_now().await;
    }
}
