use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use super::{
    debounce::{SaveDebouncer, SAVE_DEBOUNCE},
    schema::Settings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Where settings are read from and written to. Opaque to the rest of the crate.
pub trait SettingsBackend: Send + Sync + 'static {
    /// Raw persisted text, or `None` when nothing was saved yet.
    fn read_raw(&self) -> Result<Option<String>>;
    fn write_raw(&self, contents: &str) -> Result<()>;
    fn describe(&self) -> String;
}

pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsBackend for JsonFileBackend {
    fn read_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))
    }

    fn write_raw(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads and normalizes persisted settings. Never fails: anything unreadable
/// is logged and replaced by defaults.
pub fn load_settings(backend: &dyn SettingsBackend) -> Settings {
    let raw = match backend.read_raw() {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            log_info!("No saved settings at {}; using defaults", backend.describe());
            return Settings::default();
        }
        Err(err) => {
            log_error!("{err:#}; using defaults");
            return Settings::default();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => {
            let settings = Settings::from_value(&value);
            log_debug!(
                "Loaded settings with {} character entries from {}",
                settings.char_data.len(),
                backend.describe()
            );
            settings
        }
        Err(err) => {
            log_warn!(
                "Settings at {} are not valid JSON ({err}); using defaults",
                backend.describe()
            );
            Settings::default()
        }
    }
}

struct StoreInner {
    backend: Arc<dyn SettingsBackend>,
    data: RwLock<Settings>,
    debouncer: SaveDebouncer,
}

impl StoreInner {
    fn read_guard(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serializes the in-memory state as it is right now and hands it to the
    /// backend. The lock is released before any I/O happens.
    fn persist(&self) -> Result<()> {
        let serialized = {
            let guard = self.read_guard();
            serde_json::to_string_pretty(&*guard)?
        };
        self.backend.write_raw(&serialized)
    }
}

/// Single owner of the process-wide [`Settings`] value.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

impl SettingsStore {
    pub fn open(path: PathBuf) -> Self {
        Self::load(Arc::new(JsonFileBackend::new(path)))
    }

    pub fn load(backend: Arc<dyn SettingsBackend>) -> Self {
        Self::with_debounce(backend, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(backend: Arc<dyn SettingsBackend>, delay: Duration) -> Self {
        let data = load_settings(backend.as_ref());
        Self {
            inner: Arc::new(StoreInner {
                backend,
                data: RwLock::new(data),
                debouncer: SaveDebouncer::new(delay),
            }),
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Settings {
        self.inner.read_guard().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.inner.read_guard())
    }

    /// Mutates without scheduling a write. Lazily created character entries go
    /// through here: they only hit disk alongside the next real edit.
    pub fn with_settings_mut<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.inner.write_guard())
    }

    /// Mutates and schedules a debounced write.
    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let result = self.with_settings_mut(f);
        self.save();
        result
    }

    /// Schedules a write of whatever the settings hold when the debounce fires.
    /// Failures are logged, never returned.
    pub fn save(&self) {
        let inner = self.inner.clone();
        self.inner.debouncer.schedule(move || {
            if let Err(err) = inner.persist() {
                log_error!("Failed to save settings: {err:#}");
            }
        });
    }

    /// Writes immediately, dropping any pending debounced write.
    pub fn flush(&self) -> Result<()> {
        self.inner.debouncer.cancel();
        self.inner.persist()
    }

    #[cfg(test)]
    pub fn has_pending_save(&self) -> bool {
        self.inner.debouncer.is_pending()
    }
}
