use crate::crx::ConversionResult;
use crate::error::Error;
use crate::extension::FetchKey;

use std::time::{Duration, Instant};

/// A fully resolved fetch, as stored by a [`CacheBackend`].
///
/// Entries are only created once a job reached `Done` or failed with a
/// permanent error, so readers never observe a partial result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: FetchKey,
    pub outcome: Result<ConversionResult, Error>,
    pub created_at: Instant,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn new(key: FetchKey, outcome: Result<ConversionResult, Error>) -> Self {
        Self {
            key,
            outcome,
            created_at: Instant::now(),
        }
    }

    /// Whether the entry has outlived `ttl`.
    ///
    /// Failures are permanent for the lifetime of the process and never
    /// expire; only successful conversions honour the TTL.
    pub fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match (ttl, &self.outcome) {
            (Some(ttl), Ok(_)) => now.saturating_duration_since(self.created_at) >= ttl,
            _ => false,
        }
    }
}

/// Storage for completed fetches, keyed by [`FetchKey`].
///
/// The orchestrator serializes its own calls, but backends are shared
/// across tasks and must be internally synchronized.
pub trait CacheBackend: Send + Sync {
    /// Look up a live entry.
    fn get(&self, key: &FetchKey) -> Option<CacheEntry>;

    /// Store `entry` under `entry.key`, replacing any previous entry.
    fn put(&self, entry: CacheEntry);

    /// Remove and return the entry for `key`.
    fn evict(&self, key: &FetchKey) -> Option<CacheEntry>;
}
