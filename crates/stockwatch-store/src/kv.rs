//! Flat key-value persistence.
//!
//! Values are JSON objects. [`KeyValueStore::put`] shallow-merges a patch
//! into whatever is stored under the key (last write wins per field) and
//! only touches memory; [`KeyValueStore::flush`] writes the whole map out.
//! A failed flush leaves memory untouched and the store dirty, so the next
//! flush retries.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;

pub trait KeyValueStore: Send + Sync {
    /// Loads persisted entries. Calling it again after a successful load is
    /// a no-op.
    fn load(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Option<Value>> + Send;

    /// Shallow-merges `patch` into the object stored under `key`, creating
    /// it if absent.
    fn put(
        &self,
        key: &str,
        patch: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persists all writes since the last successful flush.
    fn flush(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Default)]
struct Entries {
    map: BTreeMap<String, Value>,
    /// Bumped on every write; compared against the persisted version.
    version: u64,
    loaded: bool,
}

impl Entries {
    fn merge(&mut self, key: &str, patch: Map<String, Value>) {
        match self.map.get_mut(key) {
            Some(Value::Object(existing)) => existing.extend(patch),
            _ => {
                self.map.insert(key.to_owned(), Value::Object(patch));
            }
        }
        self.version += 1;
    }
}

/// JSON file backend. The whole map lives in memory and is written to
/// `path` atomically (temp file + rename) on flush.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Entries>,
    /// Serializes flushes and holds the last persisted version.
    persisted: Mutex<u64>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(Entries::default()),
            persisted: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when writes exist that have not reached disk.
    pub async fn is_dirty(&self) -> bool {
        let version = self.entries.read().await.version;
        version != *self.persisted.lock().await
    }

    async fn write_atomically(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await
    }
}

impl KeyValueStore for JsonFileStore {
    async fn load(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.loaded {
            return Ok(());
        }

        let map = match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(obj) => obj.into_iter().collect(),
                _ => {
                    return Err(StoreError::InvalidFormat {
                        path: self.path.clone(),
                    })
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file yet, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        // Entries written before load() keep precedence over disk.
        for (key, value) in map {
            entries.map.entry(key).or_insert(value);
        }
        entries.loaded = true;
        tracing::info!(path = %self.path.display(), entries = entries.map.len(), "state loaded");
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.map.get(key).cloned()
    }

    async fn put(&self, key: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.entries.write().await.merge(key, patch);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut persisted = self.persisted.lock().await;
        let (bytes, version) = {
            let entries = self.entries.read().await;
            if entries.version == *persisted {
                return Ok(());
            }
            (serde_json::to_vec_pretty(&entries.map)?, entries.version)
        };

        self.write_atomically(&bytes)
            .await
            .map_err(|e| StoreError::Persist {
                path: self.path.clone(),
                source: e,
            })?;
        *persisted = version;
        tracing::debug!(path = %self.path.display(), version, "state flushed");
        Ok(())
    }
}

/// In-memory backend without durability, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, for assertions.
    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.read().await.map.clone()
    }
}

impl KeyValueStore for MemoryStore {
    async fn load(&self) -> Result<(), StoreError> {
        self.entries.write().await.loaded = true;
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.map.get(key).cloned()
    }

    async fn put(&self, key: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.entries.write().await.merge(key, patch);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
