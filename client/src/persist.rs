//! Local persistence adapter.
//!
//! Durable key -> serialized-value storage for the store state: the three
//! entity collections, the pending operation queue, and the last-sync
//! watermark, each under a fixed key (one JSON file per key under the data
//! directory). Reads are synchronous at startup; writes happen after every
//! state change through a temp-file-then-rename so a crash mid-write never
//! corrupts the previous value.
//!
//! Corrupt or missing values fall back to empty defaults with a logged
//! warning. Startup never fails on bad persisted data.

use cuentas_engine::{Store, StoreSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Fixed persistence keys.
pub const KEY_MEMBERS: &str = "members";
pub const KEY_REASONS: &str = "reasons";
pub const KEY_ENTRIES: &str = "entries";
pub const KEY_PENDING_OPS: &str = "pending_ops";
pub const KEY_LAST_SYNC: &str = "last_sync";

/// File-backed key-value storage under one data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the data directory.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read the raw serialized value for a key, if present and readable.
    pub fn read_key(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    /// Write a key's value through a temp file and rename.
    pub fn write_key(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read_key(key) {
            None => T::default(),
            Some(text) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key, error = %e, "corrupt persisted value, falling back to default");
                    T::default()
                }
            },
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        let text = serde_json::to_string(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_key(key, &text)
    }

    /// Load the persisted store for an owner.
    ///
    /// Missing or corrupt values become empty defaults; this never fails.
    pub fn load_store(&self, owner_id: &str) -> Store {
        let mut snapshot = StoreSnapshot::new(owner_id);
        snapshot.members = self.read_json(KEY_MEMBERS);
        snapshot.reasons = self.read_json(KEY_REASONS);
        snapshot.entries = self.read_json(KEY_ENTRIES);
        snapshot.pending_ops = self.read_json(KEY_PENDING_OPS);
        snapshot.watermark = self.read_json(KEY_LAST_SYNC);

        let mut store = Store::new(owner_id);
        if let Err(e) = store.import_state(snapshot) {
            tracing::warn!(error = %e, "persisted state rejected, starting empty");
            return Store::new(owner_id);
        }
        store
    }

    /// Persist the full store state, one key at a time.
    pub fn save_store(&self, store: &Store) -> io::Result<()> {
        let snapshot = store.export_state();
        self.write_json(KEY_MEMBERS, &snapshot.members)?;
        self.write_json(KEY_REASONS, &snapshot.reasons)?;
        self.write_json(KEY_ENTRIES, &snapshot.entries)?;
        self.write_json(KEY_PENDING_OPS, &snapshot.pending_ops)?;
        self.write_json(KEY_LAST_SYNC, &snapshot.watermark)
    }
}
