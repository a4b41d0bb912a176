//! Key-value persistence used to snapshot and restore sessions.
//!
//! Values are kept as JSON, so anything `Serialize + DeserializeOwned` can be
//! stored under a string key.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait KeyValueStore {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;
    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

fn decode<T: DeserializeOwned>(key: &str, value: Option<&Value>) -> Result<Option<T>> {
    value
        .map(|v| {
            serde_json::from_value(v.clone())
                .with_context(|| format!("stored value for '{key}' has an unexpected shape"))
        })
        .transpose()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.entries.get(key))
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for '{key}'"))?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A single JSON object on disk. Loaded on open and atomically replaced after
/// every `set` or `remove`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, Value>,
}

impl JsonFileStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: HashMap::new(),
            });
        }
        let data = fs::read(&path)
            .with_context(|| format!("failed to read store at {}", path.display()))?;
        let entries = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse store at {}", path.display()))?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let blob = serde_json::to_vec_pretty(&self.entries)?;

        // The store file only ever holds a complete document: stage, then rename.
        let staging = self.staging_path();
        fs::write(&staging, blob)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace store at {}", self.path.display()))?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.entries.get(key))
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for '{key}'"))?;
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
