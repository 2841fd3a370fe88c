//! Persisted progress: coin balance, upgrade levels and step-track costs.
//!
//! Everything the shop and ledger keep across sessions goes through the
//! [`ProgressStore`] trait as flat integer keys:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `Coins` | ledger balance |
//! | `<Track>Level` | purchased level of an upgrade track |
//! | `<Track>Cost` | current price of a step-priced track |
//!
//! Two backends exist: [`MemoryStore`] for tests and headless runs, and
//! [`TomlFileStore`] which mirrors the map into `saves/progress.toml`.
//! Callers write a value and then `flush()`; a failed flush is logged and the
//! in-memory value stays authoritative for the rest of the session.

use crate::error::StoreError;
use bevy::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the progress file.
pub const PROGRESS_PATH: &str = "saves/progress.toml";

/// Opaque integer key/value store used for all persisted progression.
pub trait ProgressStore: Send + Sync {
    /// Read `key`, returning `default` when it has never been written.
    fn get_int(&self, key: &str, default: i64) -> i64;

    /// Write `key`.  Durable only after the next successful [`flush`](Self::flush).
    fn set_int(&mut self, key: &str, value: i64);

    /// Persist every pending write.
    fn flush(&mut self) -> Result<(), StoreError>;

    /// Forget every key.
    fn clear(&mut self);

    /// Snapshot of every key currently held.
    fn entries(&self) -> BTreeMap<String, i64>;
}

// ── Memory backend ────────────────────────────────────────────────────────────

/// Volatile store; `flush` only counts calls.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
    flushes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful flushes so far.
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl ProgressStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flushes += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn entries(&self) -> BTreeMap<String, i64> {
        self.values.clone()
    }
}

// ── TOML file backend ─────────────────────────────────────────────────────────

/// Store backed by a flat TOML table of integers.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
}

impl TomlFileStore {
    /// Load `path`, reporting I/O and parse failures.  A missing file is an
    /// empty store, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<BTreeMap<String, i64>>(&contents).map_err(|e| {
                StoreError::Parse {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Io {
                    path,
                    message: e.to_string(),
                })
            }
        };
        Ok(Self { path, values })
    }

    /// Like [`load`](Self::load) but a corrupt or unreadable file falls back
    /// to an empty store with a warning.  The next flush overwrites it.
    pub fn open_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                warn!("[progress] {e}; starting from defaults");
                Self {
                    path,
                    values: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for TomlFileStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let body = toml::to_string(&self.values).map_err(|e| StoreError::Serialize {
            message: e.to_string(),
        })?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| StoreError::Io {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }
        fs::write(&self.path, body).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn entries(&self) -> BTreeMap<String, i64> {
        self.values.clone()
    }
}

// ── Bevy resource ─────────────────────────────────────────────────────────────

/// The active progress store, shared by the ledger and the upgrade catalog.
#[derive(Resource)]
pub struct Progress(pub Box<dyn ProgressStore>);

impl Progress {
    pub fn memory() -> Self {
        Self(Box::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &dyn ProgressStore {
        self.0.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn ProgressStore {
        self.0.as_mut()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::memory()
    }
}

/// Read a non-negative counter, treating negative or oversized values as
/// corruption and falling back to `default`.
pub fn read_u32(store: &dyn ProgressStore, key: &str, default: u32) -> u32 {
    let raw = store.get_int(key, i64::from(default));
    match u32::try_from(raw) {
        Ok(v) => v,
        Err(_) => {
            warn!("[progress] key '{key}' holds {raw}; using {default}");
            default
        }
    }
}

/// Write `value` under `key` and flush.  Flush failures are logged only.
pub fn write_and_flush(store: &mut dyn ProgressStore, key: &str, value: i64) {
    store.set_int(key, value);
    if let Err(e) = store.flush() {
        error!("[progress] failed to persist '{key}': {e}");
    }
}

/// Wipe every persisted key and flush the empty store.
pub fn reset_progress(store: &mut dyn ProgressStore) {
    store.clear();
    match store.flush() {
        Ok(()) => info!("[progress] progress reset"),
        Err(e) => error!("[progress] failed to persist reset: {e}"),
    }
}
