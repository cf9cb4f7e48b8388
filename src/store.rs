//! Flat key/value persistence.
//!
//! The engine treats persistence as a plain get/set substrate. Values are
//! JSON; a value that cannot be decoded into the expected type is logged and
//! treated as absent.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub trait KvStore: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// Decode `key` as `T`. Missing keys and malformed values both yield `None`.
pub fn read_typed<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed persisted value, treating as absent");
            None
        }
    }
}

/// Encode and write `value`, logging instead of failing.
pub fn write_logged<T: serde::Serialize>(store: &mut dyn KvStore, key: &str, value: &T) {
    let encoded = match serde_json::to_value(value) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to encode value for store");
            return;
        }
    };
    if let Err(e) = store.set(key, encoded) {
        tracing::warn!(key, error = %e, "store write failed");
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// A single JSON object on disk, rewritten after every change.
pub struct FileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileStore {
    /// Open `path`. A missing file starts empty; an unreadable document is
    /// logged and also starts empty.
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read store file: {}", path.display()))?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "store file is not a JSON object, starting empty"
                    );
                    Map::new()
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "store file is malformed, starting empty"
                    );
                    Map::new()
                }
            }
        } else {
            Map::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn flush(&self) -> Result<()> {
        let body = serde_json::to_vec_pretty(&self.values)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
