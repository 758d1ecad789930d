//! Key-value store for exported artifacts
//!
//! Each key is a file name under the artifacts directory; each value is one
//! pretty-printed JSON document.

use crate::{HarvestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Named store of durable JSON values
pub trait KeyValueStore {
    /// Stores `value` under `key`, replacing any previous value
    fn set_value(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    /// Reads the value stored under `key`, if any
    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>>;
}

/// Serializes `value` and stores it under `key`
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set_value(key, &serde_json::to_value(value)?)
}

/// Reads and deserializes the value stored under `key`
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    store
        .get_value(key)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(HarvestError::from)
}

/// File-backed store: one JSON file per key
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

fn file_error(path: &Path, source: std::io::Error) -> HarvestError {
    HarvestError::FileIo {
        path: path.display().to_string(),
        source,
    }
}

impl KeyValueStore for FileKeyValueStore {
    /// Writes to a temporary file first and renames it over the target, so a
    /// reader never sees a half-written artifact
    fn set_value(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| file_error(&self.dir, e))?;

        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{}.tmp", key));
        let contents = serde_json::to_string_pretty(value)?;

        fs::write(&tmp_path, contents).map_err(|e| file_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| file_error(&path, e))?;

        tracing::debug!("Wrote artifact {}", path.display());
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(file_error(&path, e)),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }
}
