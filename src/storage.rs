//! Key-value storage backends
//!
//! The persistence layer reads and writes whole values by key. Two backends
//! implement [`KeyValueStore`]:
//!
//! - [`FileStore`]: one `<key>.json` file per key inside a data directory.
//!   Writes go through [`crate::lock::replace_contents_locked`].
//! - [`MemoryStore`]: an in-process map whose clones share state. Used by
//!   tests, and able to simulate a backend that rejects writes.
//!
//! # Directory Structure
//!
//! ```text
//! <data_dir>/
//!   taskManager_tasks.json        # Primary task collection
//!   taskManager_tasks.json.lock   # Advisory lock sidecar
//!   tasks.json                    # Legacy collection (read-only fallback)
//!   todo_tasks.json               # Legacy collection (read-only fallback)
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Extension appended to every key in the file backend
pub const VALUE_EXTENSION: &str = "json";

/// A durable local key-value store holding string values
pub trait KeyValueStore {
    /// Read the value stored under `key`, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Check that a key can be used as a file stem
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("storage key cannot be empty".to_string()));
    }
    if !key
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(Error::InvalidArgument(format!(
            "storage key '{key}' may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// File-backed key-value store rooted at a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    /// Create a store rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Override how long a write waits for the lock
    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path to the data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{VALUE_EXTENSION}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        lock::replace_contents_locked(&self.path_for(key), value.as_bytes(), self.lock_timeout_ms)
    }

}

/// In-memory key-value store; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    reject_writes: Rc<Cell<bool>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Make every subsequent `set` fail, as a full or disabled disk would
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Snapshot of a stored value
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.reject_writes.get() {
            return Err(Error::OperationFailed(
                "storage is not accepting writes".to_string(),
            ));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
