//! Key-value persistence gateway.
//!
//! The core never talks to the filesystem directly. Every component that needs
//! durability is handed a [`KeyValueStore`] at construction time; absence of a
//! key means "not yet initialized" and is never an error.

use crate::StorageError;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Persisted key names
pub mod keys {
    pub const WATER_RECORDS: &str = "water-records";
    pub const USER_SETTINGS: &str = "user-settings";
    pub const DAILY_GOAL: &str = "daily-goal";
    pub const DAILY_GOAL_CUSTOM: &str = "daily-goal-custom";
}

/// Durable string-valued key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value, `None` if the key was never written
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encode a value as compact JSON and write it
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let contents = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &contents)
}

// ============================================================================
// File-backed store
// ============================================================================

/// One file per key inside a directory, with file locking
///
/// Writes go to a temp file in the same directory which is synced and then
/// renamed over the target, so readers never observe a partial value.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(io_error(
                key,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid key name"),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(key, e)),
        };

        // Acquire shared lock for reading
        file.lock_shared().map_err(|e| io_error(key, e))?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        read.map_err(|e| io_error(key, e))?;

        tracing::debug!("Read key '{}' from {:?}", key, path);
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;

        // Create unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(&self.dir).map_err(|e| io_error(key, e))?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file()
            .lock_exclusive()
            .map_err(|e| io_error(key, e))?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer
                .write_all(value.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| io_error(key, e))?;
        }

        temp.as_file().sync_all().map_err(|e| io_error(key, e))?;
        temp.as_file().unlock().map_err(|e| io_error(key, e))?;

        // Atomically replace the old value
        temp.persist(&path).map_err(|e| io_error(key, e.error))?;

        tracing::debug!("Wrote key '{}' to {:?}", key, path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}
