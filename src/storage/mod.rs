use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::{ConfigPaths, StorageOptions};

const ENTRY_EXTENSION: &str = "json";
const ENTRY_TMP_EXTENSION: &str = "json.tmp";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("reading store entry {key}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("writing store entry {key}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("serialising store entry {key}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store is read-only")]
    ReadOnly,
}

/// Synchronous key/value store holding whole serialized values.
///
/// `get` returns `Ok(None)` for absent keys; callers decide what a missing or
/// unreadable value means for them.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One file per key under a directory, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating store directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            key: key.to_string(),
            source,
        };
        let final_path = self.entry_path(key);
        let tmp_path = final_path.with_extension(ENTRY_TMP_EXTENSION);
        fs::write(&tmp_path, value).map_err(write_err)?;
        fs::rename(&tmp_path, &final_path).map_err(write_err)?;
        Ok(())
    }
}

/// Process-local store, used by tests and as a scratch backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }

    /// Makes every subsequent `set` fail, mimicking an exhausted quota.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, options: &StorageOptions) -> Result<FileStore> {
    let store = FileStore::open(&paths.store_dir)?;
    tracing::debug!(
        dir = %store.dir().display(),
        key = %options.key,
        "opened file store"
    );
    Ok(store)
}
