//! Persisted settings store.
//!
//! A generic key/value store of JSON blobs. The store enforces no schema;
//! typed decoding happens in the settings and payment modules.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// Option key holding the user-editable storefront settings.
pub const SETTINGS_KEY: &str = "woonuxt_options";

/// Option key holding the payment provider settings.
pub const PAYMENT_SETTINGS_KEY: &str = "woocommerce_stripe_settings";

/// Option key holding the GraphQL server settings.
pub const GRAPHQL_SETTINGS_KEY: &str = "graphql_general_settings";

/// Errors from writing the settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("settings file {} is not a JSON object; refusing to overwrite it", path.display())]
    Corrupt { path: PathBuf },
}

/// Key/value settings storage.
pub trait SettingsStore: Send + Sync {
    /// Read a blob. Missing keys and unreadable storage both read as `None`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a blob, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { values: Mutex::new(values) }
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file. A missing file is an empty map; anything else
    /// that is not a JSON object is an error.
    fn load(&self) -> Result<serde_json::Map<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(serde_json::Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(StoreError::Corrupt { path: self.path.clone() }),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock();
        match self.load() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable settings file");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        map.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        write_atomic(&self.path, content.as_bytes())?;

        Ok(())
    }
}

/// Write `content` to `path` through a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
