//! Bearer token storage.
//!
//! The token must survive a restart, so the production store is a small JSON
//! file. An in-memory store is provided for tests and ephemeral sessions.

use crate::error::HttpResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Holder of the current auth token.
pub trait TokenStore: Send + Sync {
    /// Current token, if any.
    fn token(&self) -> Option<String>;

    /// Replace the stored token.
    fn set_token(&self, token: &str) -> HttpResult<()>;

    /// Forget the stored token. Clearing an empty store is not an error.
    fn clear(&self) -> HttpResult<()>;
}

/// Token held in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: &str) -> HttpResult<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> HttpResult<()> {
        *self.token.write() = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Token persisted to a JSON file and cached in memory.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading a previously saved token.
    ///
    /// A missing file means "no token". An unreadable or malformed file is
    /// logged and treated the same way.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match load(&path) {
            Ok(token) => token,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        };
        debug!(path = %path.display(), has_token = cached.is_some(), "Token store opened");
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> HttpResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let stored: StoredToken = serde_json::from_str(&content)?;
            Ok(Some(stored.token))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.cached.read().clone()
    }

    fn set_token(&self, token: &str) -> HttpResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;
        *self.cached.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> HttpResult<()> {
        *self.cached.write() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
