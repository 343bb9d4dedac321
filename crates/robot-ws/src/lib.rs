//! Realtime connection to the Trading Robot backend.
//!
//! Provides a single shared WebSocket connection with:
//! - Deduplicated connects (concurrent callers share one handshake)
//! - Automatic reconnection with exponential backoff and a retry ceiling
//! - Heartbeat monitoring (WebSocket ping, pong timeout detection)
//! - Topic fan-out to subscribed callbacks, isolated from callback panics

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod subscription;

pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, DropReason, ReconnectTrigger,
};
pub use error::{WsError, WsResult};
pub use subscription::{EventCallback, SubscriberRegistry, Subscription};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the process-wide TLS crypto provider.
///
/// Call once before the first `wss://` connection.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
