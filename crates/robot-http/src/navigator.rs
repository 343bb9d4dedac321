//! Client-side navigation hook used for the login redirect.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Moves the user to another view (the login view after a 401).
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless use: logs the redirect and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        warn!(path, "Navigation requested");
    }
}

/// Navigator that remembers every requested path.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().push(path.to_string());
    }
}
