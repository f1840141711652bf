//! Transient key/value cache with per-entry time-to-live.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A TTL cache. Expired entries read as misses.
pub trait TransientCache: Send + Sync {
    /// Read a live entry.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write an entry that expires after `ttl`.
    fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Remove an entry.
    fn delete(&self, key: &str);
}

fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: Value,
    expires_at: u64,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self { value, expires_at: now_secs().saturating_add(ttl.as_secs()) }
    }

    fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransientCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock();
        entries.get(key).filter(|e| e.is_live(now_secs())).map(|e| e.value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.lock().insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Cache persisted as a single JSON file, shared across CLI invocations.
///
/// Unreadable or corrupt files are treated as empty; write failures are
/// logged and dropped, since a cache miss is always recoverable.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    /// Create a cache backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, CacheEntry> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) {
        let result = serde_json::to_string_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|content| super::store::write_atomic(&self.path, content.as_bytes()));

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write cache file");
        }
    }
}

impl TransientCache for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock();
        self.load().remove(key).filter(|e| e.is_live(now_secs())).map(|e| e.value)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let _guard = self.lock.lock();
        let now = now_secs();
        let mut entries = self.load();
        entries.retain(|_, e| e.is_live(now));
        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        self.save(&entries);
    }

    fn delete(&self, key: &str) {
        let _guard = self.lock.lock();
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            self.save(&entries);
        }
    }
}
