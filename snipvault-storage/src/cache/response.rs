//! Typed JSON facade over a cache backend.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use snipvault_core::{CatalogResult, UpstreamError};

use super::freshness::CacheRead;
use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, CachedPayload};

/// Serializes response payloads to JSON and back around a shared
/// [`CacheBackend`].
///
/// Every method surfaces backend failures as errors; deciding whether a
/// failure degrades or aborts is the caller's job.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache").finish_non_exhaustive()
    }
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Read and decode an entry.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> CatalogResult<Option<CacheRead<T>>> {
        let Some(payload) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&payload.body).map_err(|e| {
            UpstreamError::Serialization {
                reason: format!("cache entry {key}: {e}"),
            }
        })?;
        Ok(Some(CacheRead::new(value, payload.cached_at)))
    }

    /// Encode and store an entry unconditionally.
    pub async fn put_json<T: Serialize + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> CatalogResult<()> {
        let payload = CachedPayload::new(serde_json::to_string(value)?);
        self.backend.set(key, payload, ttl).await
    }

    /// Encode and store an entry unless the key was invalidated after
    /// `generation` was read.
    pub async fn put_json_if_unchanged<T: Serialize + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
        generation: u64,
    ) -> CatalogResult<bool> {
        let payload = CachedPayload::new(serde_json::to_string(value)?);
        self.backend
            .set_if_unchanged(key, payload, ttl, generation)
            .await
    }

    pub async fn generation(&self, key: &CacheKey) -> CatalogResult<u64> {
        self.backend.generation(key).await
    }

    /// Remove an entry. Returns whether a live entry was removed.
    pub async fn invalidate(&self, key: &CacheKey) -> CatalogResult<bool> {
        self.backend.delete(key).await
    }

    pub async fn stats(&self) -> CatalogResult<CacheStats> {
        self.backend.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheBackend;
    use snipvault_core::{CatalogError, ItemId};

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryCacheBackend::new()))
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let cache = cache();
        let key = CacheKey::item(ItemId::now_v7());
        assert!(cache.get_json::<Vec<u32>>(&key).await.unwrap().is_none());

        cache
            .put_json(&key, &vec![1u32, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();
        let read = cache.get_json::<Vec<u32>>(&key).await.unwrap().unwrap();
        assert!(read.age() < Duration::from_secs(60));
        assert_eq!(read.into_value(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_serialization_error() {
        let cache = cache();
        let key = CacheKey::item(ItemId::now_v7());
        cache
            .put_json(&key, &"text", Duration::from_secs(60))
            .await
            .unwrap();

        let err = cache.get_json::<u32>(&key).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Upstream(UpstreamError::Serialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalidate_blocks_stale_put() {
        let cache = cache();
        let key = CacheKey::item(ItemId::now_v7());
        let generation = cache.generation(&key).await.unwrap();
        cache.invalidate(&key).await.unwrap();

        let written = cache
            .put_json_if_unchanged(&key, &1u32, Duration::from_secs(60), generation)
            .await
            .unwrap();
        assert!(!written);
        assert!(cache.get_json::<u32>(&key).await.unwrap().is_none());
    }
}
