//! Local key-value store for power6
//!
//! All persistent state is a flat mapping from string keys to JSON values:
//!
//! ```text
//! power6_tasks              # current working set (array of Task)
//! history_<YYYY-MM-DD>      # archived day (array of Task)
//! streak                    # streak count, stringified integer
//! last_completed_day        # last perfect day, YYYY-MM-DD
//! user_tier                 # cached tier string
//! ```
//!
//! `FileStore` keeps the whole map in one JSON object file under the data
//! directory; `MemoryStore` keeps it in process memory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Key holding the current day's working set
pub const TASKS_KEY: &str = "power6_tasks";

/// Prefix of per-day history keys
pub const HISTORY_PREFIX: &str = "history_";

/// Key holding the streak count
pub const STREAK_KEY: &str = "streak";

/// Key holding the last perfect day
pub const LAST_COMPLETED_KEY: &str = "last_completed_day";

/// Key holding the cached user tier
pub const TIER_KEY: &str = "user_tier";

/// Default store file name inside the data directory
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// A single change in a batch: `Some` writes the value, `None` removes the key
pub type StoreWrite = (String, Option<Value>);

/// Synchronous, persistent string-keyed JSON store
pub trait LocalStore: Send + Sync {
    /// Raw value for `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite `key`
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Apply all writes as one unit: either every change lands or none do
    fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()>;

    /// All keys currently present, in ascending order
    fn keys(&self) -> Result<Vec<String>>;
}

/// Typed helpers over any `LocalStore`
pub trait StoreExt {
    /// Deserialize the value at `key`
    ///
    /// Missing keys and values that fail to parse both read as `None`; a parse
    /// failure is logged and otherwise ignored.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    /// Serialize `value` and store it at `key`
    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()>;
}

impl<S: LocalStore + ?Sized> StoreExt for S {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read store entry");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring malformed store entry");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?)
    }
}

// =========================================================================
// File-backed store
// =========================================================================

/// Store persisted as a single JSON object file
///
/// Every mutation is a locked read-modify-write followed by an atomic
/// replace, so concurrent processes never observe a partial file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Store file `file_name` inside `data_dir`
    pub fn in_dir(data_dir: &Path, file_name: &str) -> Self {
        Self::new(data_dir.join(file_name))
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path to the backing JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(Error::Io(err)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "store file is not a JSON object; treating it as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;
        lock::write_atomic(&self.path, json.as_bytes())
    }

    fn update(&self, op: impl FnOnce(&mut BTreeMap<String, Value>)) -> Result<()> {
        lock::with_lock(&self.path, self.lock_timeout_ms, || {
            let mut map = self.read_map()?;
            op(&mut map);
            self.write_map(&map)
        })
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()> {
        self.update(|map| apply_writes(map, writes))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

// =========================================================================
// In-memory store
// =========================================================================

/// Process-local store, used by tests and embedders without a data directory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, op: impl FnOnce(&mut BTreeMap<String, Value>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Io(io::Error::other("memory store mutex poisoned")))?;
        Ok(op(&mut entries))
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()> {
        self.with_entries(|entries| apply_writes(entries, writes))
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_entries(|entries| entries.keys().cloned().collect())
    }
}

fn apply_writes(map: &mut BTreeMap<String, Value>, writes: Vec<StoreWrite>) {
    for (key, value) in writes {
        match value {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                map.remove(&key);
            }
        }
    }
}
