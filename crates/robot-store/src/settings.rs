//! User settings, persisted as a JSON file.

use crate::error::StoreResult;
use parking_lot::RwLock;
use robot_core::UserSettings;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct SettingsInner {
    path: Option<PathBuf>,
    settings: RwLock<UserSettings>,
}

/// Settings handle. Every update is written through to the backing file
/// when one is configured.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsInner>,
}

impl SettingsStore {
    /// Open the store at `path`. A missing file yields defaults; an
    /// unreadable one is logged and also yields defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match Self::load(&path) {
            Ok(Some(settings)) => {
                info!(path = %path.display(), "Loaded user settings");
                settings
            }
            Ok(None) => UserSettings::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                UserSettings::default()
            }
        };
        Self::build(Some(path), settings)
    }

    /// Read settings from `path`; `None` when the file does not exist.
    pub fn load(path: &Path) -> StoreResult<Option<UserSettings>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::build(None, UserSettings::default())
    }

    fn build(path: Option<PathBuf>, settings: UserSettings) -> Self {
        Self {
            inner: Arc::new(SettingsInner {
                path,
                settings: RwLock::new(settings),
            }),
        }
    }

    pub fn settings(&self) -> UserSettings {
        self.inner.settings.read().clone()
    }

    /// Mutate the settings and save. Returns the new settings.
    pub fn update<F>(&self, f: F) -> StoreResult<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let updated = {
            let mut settings = self.inner.settings.write();
            f(&mut settings);
            settings.clone()
        };
        self.write(&updated)?;
        Ok(updated)
    }

    /// Replace the settings wholesale (e.g. with the server copy) and save.
    pub fn replace(&self, settings: UserSettings) -> StoreResult<()> {
        *self.inner.settings.write() = settings.clone();
        self.write(&settings)
    }

    /// Write the current settings to disk.
    pub fn save(&self) -> StoreResult<()> {
        let settings = self.settings();
        self.write(&settings)
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn write(&self, settings: &UserSettings) -> StoreResult<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a truncated file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(settings)?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Saved user settings");
        Ok(())
    }
}
