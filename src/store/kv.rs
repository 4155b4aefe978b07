//! Key-value persistence behind the record store.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// KeyValueStore
// ============================================================================

/// A persistent map of JSON values.
///
/// Writes replace the whole value under a key. There are no transactions:
/// two read-modify-write cycles racing on one key lose an update.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Reads and deserializes the value under `key`.
///
/// A value of the wrong shape is a [`Error::Storage`] error.
pub async fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::storage(format!("Malformed value under {key:?}: {e}"))),
    }
}

/// Serializes `value` and stores it under `key`.
pub async fn save<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Non-persistent store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// Store persisted as one JSON object in a file.
///
/// The file is read once on open and rewritten atomically on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    entries: tokio::sync::Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice(&bytes)? {
                Value::Object(map) => map,
                _ => {
                    return Err(Error::storage(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened JSON store");

        Ok(Self {
            path,
            entries: tokio::sync::Mutex::new(entries),
        })
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;

        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        let bytes = serde_json::to_vec_pretty(&next)?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| Error::storage(format!("Store writer task failed: {e}")))??;

        *entries = next;
        trace!(key, "Store updated");
        Ok(())
    }
}

/// Writes through a temporary file in the same directory, then renames.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut file = tempfile::NamedTempFile::new_in(&dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
