//! Persistent settings store for the tubedrop application
//!
//! This module provides a small namespaced key/value store backed by a single
//! JSON file, used to persist upload configuration and run state across
//! process restarts. Writes go through a temporary file and an atomic rename
//! so a crash never leaves a half-written settings file behind.

use crate::error::{UploadError, UploadResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for the settings store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the JSON settings file
    pub path: PathBuf,
}

impl StoreConfig {
    /// Create a new StoreConfig from environment variables
    ///
    /// # Environment Variables
    /// - `TUBEDROP_SETTINGS_PATH`: settings file path (default: "tubedrop-settings.json")
    pub fn from_env() -> Self {
        let path = std::env::var("TUBEDROP_SETTINGS_PATH")
            .unwrap_or_else(|_| "tubedrop-settings.json".to_string());

        StoreConfig { path: path.into() }
    }
}

/// Namespaced key/value settings store
///
/// The backing file holds one JSON object per namespace. Values are plain
/// JSON scalars (strings, numbers, booleans). Every operation reads and
/// rewrites the whole file; the file is small and this keeps the store free
/// of any in-process locking.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    namespace: String,
}

impl SettingsStore {
    /// Create a store over `path`, scoped to `namespace`
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        SettingsStore {
            path: path.into(),
            namespace: namespace.into(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a value by key, or `None` if the key was never set
    pub async fn get(&self, key: &str) -> UploadResult<Option<Value>> {
        let root = self.read_root().await?;
        Ok(root
            .get(&self.namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    /// Get a string value by key
    pub async fn get_string(&self, key: &str) -> UploadResult<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    /// Get an unsigned integer value by key
    ///
    /// Returns `None` when the key is absent or the stored value is not
    /// numeric, so callers can fall back to their declared default.
    pub async fn get_u64(&self, key: &str) -> UploadResult<Option<u64>> {
        Ok(self.get(key).await?.and_then(|v| v.as_u64()))
    }

    /// Get a boolean value by key
    pub async fn get_bool(&self, key: &str) -> UploadResult<Option<bool>> {
        Ok(self.get(key).await?.and_then(|v| v.as_bool()))
    }

    /// Set a key to a value, creating the namespace and file as needed
    pub async fn set(&self, key: &str, value: Value) -> UploadResult<()> {
        let mut root = self.read_root().await?;
        let ns = root
            .entry(self.namespace.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        match ns {
            Value::Object(map) => {
                map.insert(key.to_string(), value);
            }
            other => {
                // A corrupt namespace entry is replaced wholesale
                let mut map = Map::new();
                map.insert(key.to_string(), value);
                *other = Value::Object(map);
            }
        }
        self.write_root(&root).await
    }

    /// Remove a key; removing an absent key is a no-op
    pub async fn remove(&self, key: &str) -> UploadResult<()> {
        let mut root = self.read_root().await?;
        if let Some(Value::Object(map)) = root.get_mut(&self.namespace) {
            map.remove(key);
        }
        self.write_root(&root).await
    }

    /// Remove every key in this store's namespace
    pub async fn clear(&self) -> UploadResult<()> {
        let mut root = self.read_root().await?;
        root.remove(&self.namespace);
        self.write_root(&root).await
    }

    /// List the keys currently set in this namespace
    pub async fn keys(&self) -> UploadResult<Vec<String>> {
        let root = self.read_root().await?;
        Ok(match root.get(&self.namespace) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn read_root(&self) -> UploadResult<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(UploadError::Store(e)),
        };

        let value: Value =
            serde_json::from_slice(&bytes).map_err(UploadError::Serialization)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    async fn write_root(&self, root: &Map<String, Value>) -> UploadResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(UploadError::Store)?;
            }
        }

        let bytes =
            serde_json::to_vec_pretty(&Value::Object(root.clone())).map_err(UploadError::Serialization)?;

        // Write to a sibling temp file, then rename over the target
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(UploadError::Store)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(UploadError::Store)?;

        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}
