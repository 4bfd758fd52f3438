//! In-memory TTL cache backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use snipvault_core::CatalogResult;
use tokio::time::Instant;

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, CachedPayload};

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: CachedPayload,
    expires_at: Instant,
}

/// Per-key state. The slot outlives its entry so the generation survives
/// deletes.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    entry: Option<StoredEntry>,
}

/// Writes between two sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: u64 = 256;

/// In-memory cache tier.
///
/// An expired entry is dropped by the first `get` that sees it. Keys that
/// are never read again are dropped by [`MemoryCacheBackend::purge_expired`],
/// which runs every `sweep_interval` writes. Expiry uses
/// `tokio::time::Instant`, so tests can drive it with a paused clock.
#[derive(Debug)]
pub struct MemoryCacheBackend {
    slots: DashMap<CacheKey, Slot>,
    sweep_interval: u64,
    writes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep expired entries every `writes` writes. Zero is treated as one.
    pub fn with_sweep_interval(writes: u64) -> Self {
        Self {
            slots: DashMap::new(),
            sweep_interval: writes.max(1),
            writes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Number of keys currently tracked, expired or not.
    pub fn tracked_keys(&self) -> usize {
        self.slots.len()
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut purged = 0;
        for mut slot in self.slots.iter_mut() {
            if slot.entry.as_ref().is_some_and(|e| e.expires_at <= now) {
                slot.entry = None;
                purged += 1;
            }
        }
        // Slots with a non-zero generation must survive; dropping one would
        // reset its generation and let a stale write through.
        self.slots
            .retain(|_, slot| slot.entry.is_some() || slot.generation > 0);
        self.expirations.fetch_add(purged, Ordering::Relaxed);
        if purged > 0 {
            tracing::debug!(purged, "purged expired cache entries");
        }
        purged
    }

    fn write(slot: &mut Slot, payload: CachedPayload, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MAX_ENTRY_TTL))
            .unwrap_or(now);
        slot.entry = Some(StoredEntry {
            payload,
            expires_at,
        });
    }

    /// Count a write and sweep when the interval is reached. Must be called
    /// with no slot guard held.
    fn after_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.sweep_interval == 0 {
            self.purge_expired();
        }
    }
}

/// Fallback lifetime when `now + ttl` does not fit in an `Instant`.
const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> CatalogResult<Option<CachedPayload>> {
        let now = Instant::now();
        let found = self.slots.get_mut(key).and_then(|mut slot| {
            let live = slot
                .entry
                .as_ref()
                .filter(|entry| entry.expires_at > now)
                .map(|entry| entry.payload.clone());
            if live.is_none() && slot.entry.is_some() {
                slot.entry = None;
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            live
        });

        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(found)
    }

    async fn set(&self, key: &CacheKey, payload: CachedPayload, ttl: Duration) -> CatalogResult<()> {
        {
            let mut slot = self.slots.entry(key.clone()).or_default();
            Self::write(&mut slot, payload, ttl);
        }
        self.after_write();
        Ok(())
    }

    async fn set_if_unchanged(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
        generation: u64,
    ) -> CatalogResult<bool> {
        {
            let mut slot = self.slots.entry(key.clone()).or_default();
            if slot.generation != generation {
                return Ok(false);
            }
            Self::write(&mut slot, payload, ttl);
        }
        self.after_write();
        Ok(true)
    }

    async fn generation(&self, key: &CacheKey) -> CatalogResult<u64> {
        Ok(self.slots.get(key).map(|slot| slot.generation).unwrap_or(0))
    }

    async fn delete(&self, key: &CacheKey) -> CatalogResult<bool> {
        let now = Instant::now();
        let mut slot = self.slots.entry(key.clone()).or_default();
        slot.generation += 1;
        let removed = slot
            .entry
            .take()
            .is_some_and(|entry| entry.expires_at > now);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(removed)
    }

    async fn stats(&self) -> CatalogResult<CacheStats> {
        let now = Instant::now();
        let entry_count = self
            .slots
            .iter()
            .filter(|slot| slot.entry.as_ref().is_some_and(|e| e.expires_at > now))
            .count() as u64;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        })
    }
}
