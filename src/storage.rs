use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read list {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write list {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode list {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable key/value store backing the persisted lists. One key per
/// checker category.
pub trait ListStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// File-per-key store under a data directory. Writes go through a temp
/// file and rename, so a crash never leaves a torn file behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ListStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.dir.join(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Read {
                key: key.to_string(),
                source: err,
            }),
        }
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        io::Write::write_all(&mut tmp, data).map_err(write_err)?;
        tmp.persist(self.dir.join(key))
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Vec<u8>>>,
    saves: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called for the given key.
    pub fn save_count(&self, key: &str) -> usize {
        self.saves.lock().get(key).copied().unwrap_or(0)
    }
}

impl ListStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        *self.saves.lock().entry(key.to_string()).or_default() += 1;
        self.inner.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// Ordered set of unique strings with write-through persistence: every
/// successful mutation is saved before the call returns. Stored as a
/// compact JSON array of strings.
pub struct PersistedStringSet {
    key: String,
    store: Arc<dyn ListStore>,
    entries: Vec<String>,
}

impl PersistedStringSet {
    pub fn load(store: Arc<dyn ListStore>, key: &str) -> Result<Self, StoreError> {
        let entries: Vec<String> = match store.load(key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            })?,
            None => Vec::new(),
        };
        tracing::debug!(target: "storage", key, count = entries.len(), "loaded list");
        Ok(Self {
            key: key.to_string(),
            store,
            entries,
        })
    }

    /// Appends a value, returning `false` if it was already present.
    /// On a persistence failure the in-memory state is rolled back.
    pub fn insert(&mut self, value: &str) -> Result<bool, StoreError> {
        if self.entries.iter().any(|e| e == value) {
            return Ok(false);
        }
        self.entries.push(value.to_string());
        if let Err(err) = self.persist() {
            self.entries.pop();
            return Err(err);
        }
        Ok(true)
    }

    /// Removes a value, returning `false` if it was not present. Never
    /// writes when nothing changed.
    pub fn remove(&mut self, value: &str) -> Result<bool, StoreError> {
        let Some(pos) = self.position(value) else {
            return Ok(false);
        };
        let removed = self.entries.remove(pos);
        if let Err(err) = self.persist() {
            self.entries.insert(pos, removed);
            return Err(err);
        }
        Ok(true)
    }

    /// Wholesale replacement, used by externally refreshed lists. The old
    /// contents are restored if persistence fails.
    pub fn replace_all(&mut self, values: Vec<String>) -> Result<(), StoreError> {
        let prev = std::mem::replace(&mut self.entries, values);
        if let Err(err) = self.persist() {
            self.entries = prev;
            return Err(err);
        }
        Ok(())
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.entries.iter().position(|e| e == value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&self.entries).map_err(|source| StoreError::Decode {
            key: self.key.clone(),
            source,
        })?;
        self.store.save(&self.key, &bytes)?;
        tracing::debug!(target: "storage", key = %self.key, count = self.entries.len(), "wrote list");
        Ok(())
    }
}
