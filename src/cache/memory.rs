use super::traits::{CacheBackend, CacheEntry};
use crate::extension::FetchKey;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// In-process cache. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<FetchKey, CacheEntry>>,
}

impl MemoryCache {
    /// Create a cache whose successful entries live for `ttl` (`None` keeps
    /// them forever).
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the configured time to live.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &FetchKey) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        let expired = entries
            .get(key)
            .map(|entry| entry.is_expired(self.ttl, Instant::now()))?;
        if expired {
            trace!(%key, "cache entry expired");
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }

    fn put(&self, entry: CacheEntry) {
        self.entries.lock().insert(entry.key.clone(), entry);
    }

    fn evict(&self, key: &FetchKey) -> Option<CacheEntry> {
        self.entries.lock().remove(key)
    }
}
