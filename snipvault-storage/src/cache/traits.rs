//! Cache backend trait and statistics.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snipvault_core::CatalogResult;

use super::key::CacheKey;

/// A serialized value as held by the cache tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    /// JSON body.
    pub body: String,
    /// When the value was produced.
    pub cached_at: DateTime<Utc>,
}

impl CachedPayload {
    pub fn new(body: String) -> Self {
        Self {
            body,
            cached_at: Utc::now(),
        }
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// Each key carries a generation counter that only `delete` advances. A
/// reader that fetches from the store on a miss records the generation first
/// and writes back with [`CacheBackend::set_if_unchanged`], so a value read
/// before an invalidation can never be re-cached after it.
///
/// Expired entries must never be returned from `get`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a live entry.
    async fn get(&self, key: &CacheKey) -> CatalogResult<Option<CachedPayload>>;

    /// Store an entry unconditionally.
    async fn set(&self, key: &CacheKey, payload: CachedPayload, ttl: Duration) -> CatalogResult<()>;

    /// Store an entry only if the key's generation still equals
    /// `generation`. Returns whether the write happened.
    async fn set_if_unchanged(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
        generation: u64,
    ) -> CatalogResult<bool>;

    /// Current generation of the key (0 if never invalidated).
    async fn generation(&self, key: &CacheKey) -> CatalogResult<u64>;

    /// Remove an entry and advance the key's generation. Returns whether a
    /// live entry was removed.
    async fn delete(&self, key: &CacheKey) -> CatalogResult<bool>;

    /// Get cache statistics.
    async fn stats(&self) -> CatalogResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of live entries.
    pub entry_count: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
    /// Explicit deletes.
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
