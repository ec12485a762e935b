//! Session-scoped cache for remotely fetched content.
//!
//! The cache stores one JSON-encoded [`CacheEntry`] per key in a
//! [`SessionStore`] and judges freshness with an injected [`Clock`], so tests
//! can drive expiry with a manual clock and an in-memory store.
//!
//! Writes are best-effort: a failed write is logged and swallowed, never
//! surfaced to the caller.
//!
//! Stores:
//! - [`MemoryStore`]: process-lifetime map (the "session")
//! - [`FileStore`]: one file per key under a directory, file names are the
//!   first 16 hex chars of the key's SHA-256

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Source of "now" in milliseconds since the epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Key/value string storage scoped to a session
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// File-backed store, one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::storage_error(format!(
                "Cannot create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Get store directory for diagnostics
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }
}

/// Hash a key to create a safe filename
fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)[..16].to_string()
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_error(format!(
                "Cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| {
            Error::storage_error(format!("Cannot write {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_error(format!(
                "Cannot remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Stored payload with its write time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub timestamp_millis: u64,
}

/// Typed, expiring cache over a session store.
pub struct SessionCache<T> {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    key: String,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> SessionCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            key: key.into(),
            ttl,
            _payload: PhantomData,
        }
    }

    /// Fresh payload, or `None` when absent, expired or unreadable.
    ///
    /// Expired and undecodable entries are removed.
    pub fn get(&self) -> Option<T> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Session cache read failed for '{}': {}", self.key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Discarding undecodable cache entry '{}': {}", self.key, e);
                self.evict();
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(entry.timestamp_millis);
        if age >= self.ttl.as_millis() as u64 {
            log::debug!("Cache entry '{}' expired ({} ms old)", self.key, age);
            self.evict();
            return None;
        }

        Some(entry.payload)
    }

    /// Store a payload stamped with the current time. Best-effort.
    pub fn put(&self, payload: T) {
        let entry = CacheEntry {
            payload,
            timestamp_millis: self.clock.now_millis(),
        };
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Cannot encode cache entry '{}': {}", self.key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &encoded) {
            log::warn!("Session cache write failed for '{}': {}", self.key, e);
        }
    }

    /// Drop the entry
    pub fn clear(&self) {
        self.evict();
        log::info!("Session cache '{}' cleared", self.key);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn evict(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            log::warn!("Session cache eviction failed for '{}': {}", self.key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_with(
        store: Arc<dyn SessionStore>,
        clock: Arc<ManualClock>,
    ) -> SessionCache<Vec<String>> {
        SessionCache::new(store, clock, "posts", Duration::from_secs(60))
    }

    #[test]
    fn test_hash_key() {
        assert_eq!(hash_key("posts"), hash_key("posts"));
        assert_ne!(hash_key("posts"), hash_key("other"));
        assert_eq!(hash_key("posts").len(), 16);
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = cache_with(Arc::new(MemoryStore::new()), clock.clone());

        assert!(cache.get().is_none());
        cache.put(vec!["a".to_string()]);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = cache_with(store.clone(), clock.clone());

        cache.put(vec!["a".to_string()]);
        clock.advance(Duration::from_secs(60));
        assert!(cache.get().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(Arc::new(MemoryStore::new()), clock);
        cache.put(vec![]);
        cache.clear();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_garbage_entry_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set("posts", "not json").unwrap();
        let cache = cache_with(store.clone(), Arc::new(ManualClock::new(0)));
        assert!(cache.get().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("cache")).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::storage_error("quota exceeded"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::storage_error("quota exceeded"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::storage_error("quota exceeded"))
        }
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let cache = cache_with(Arc::new(FailingStore), Arc::new(ManualClock::new(0)));
        cache.put(vec!["a".to_string()]);
        assert!(cache.get().is_none());
        cache.clear();
    }
}
