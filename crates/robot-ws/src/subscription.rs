//! Topic subscriptions and event fan-out.

use parking_lot::RwLock;
use robot_core::{RealtimeEvent, Topic};
use robot_telemetry::Metrics;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{error, trace};

/// Callback invoked for every event on a subscribed topic.
pub type EventCallback = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Callbacks per topic.
///
/// Delivery iterates a snapshot taken under the read lock, so callbacks may
/// subscribe or unsubscribe (themselves included) while being delivered to.
/// Such changes take effect from the next event.
#[derive(Default)]
pub struct SubscriberRegistry {
    topics: RwLock<HashMap<Topic, Vec<EventCallback>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, topic: Topic, callback: EventCallback) {
        self.topics.write().entry(topic).or_default().push(callback);
    }

    /// Remove one registration of `callback` (pointer identity).
    ///
    /// Returns `false` when it was not registered.
    pub fn remove(&self, topic: Topic, callback: &EventCallback) -> bool {
        let mut topics = self.topics.write();
        let Some(callbacks) = topics.get_mut(&topic) else {
            return false;
        };
        let Some(index) = callbacks.iter().position(|cb| same_callback(cb, callback)) else {
            return false;
        };
        callbacks.remove(index);
        if callbacks.is_empty() {
            topics.remove(&topic);
        }
        true
    }

    pub fn count(&self, topic: Topic) -> usize {
        self.topics.read().get(&topic).map_or(0, Vec::len)
    }

    /// Deliver `event` to every callback of its topic.
    ///
    /// A panicking callback is logged and counted; the remaining callbacks
    /// still run. Returns the number of callbacks that completed.
    pub fn dispatch(&self, event: &RealtimeEvent) -> usize {
        let snapshot: Vec<EventCallback> = match self.topics.read().get(&event.topic) {
            Some(callbacks) => callbacks.clone(),
            None => Vec::new(),
        };

        if snapshot.is_empty() {
            trace!(topic = %event.topic, "No subscribers, event dropped");
            return 0;
        }

        let mut delivered = 0;
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        topic = %event.topic,
                        panic = panic_message(payload.as_ref()),
                        "Subscriber callback panicked"
                    );
                    Metrics::subscriber_panic();
                }
            }
        }
        delivered
    }
}

fn same_callback(a: &EventCallback, b: &EventCallback) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Registration handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    topic: Topic,
    callback: EventCallback,
    registry: Weak<SubscriberRegistry>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        topic: Topic,
        callback: EventCallback,
        registry: &Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            topic,
            callback,
            registry: Arc::downgrade(registry),
            active: true,
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn callback(&self) -> &EventCallback {
        &self.callback
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.topic, &self.callback);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("active", &self.active)
            .finish()
    }
}
