//! Rating coordinator: the only write path to an item's derived aggregate.
//!
//! One `rate` call runs upsert, recompute, persist, invalidate in that
//! order. The recompute always reads the full rating set, so concurrent
//! raters on one item converge on the correct aggregate no matter how their
//! steps interleave; the store's revision guard keeps an older recompute
//! from overwriting a newer one.

use std::time::Duration;

use snipvault_core::{
    CatalogError, CatalogResult, EntityKind, ItemId, RateOutcome, Rating, RatingValue, UserId,
};
use snipvault_storage::{CacheKey, ResponseCache};

use crate::config::CatalogConfig;
use crate::deadline::{with_deadline, Backends};

/// Retry policy for `item:<id>` invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationPolicy {
    pub retries: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl InvalidationPolicy {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            retries: config.invalidation_retries,
            backoff: config.invalidation_backoff,
            timeout: config.backend_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatingCoordinator {
    backends: Backends,
    policy: InvalidationPolicy,
}

impl RatingCoordinator {
    pub fn new(backends: Backends, config: &CatalogConfig) -> Self {
        Self {
            backends,
            policy: InvalidationPolicy::from_config(config),
        }
    }

    /// Record `user_id`'s rating of `item_id`.
    ///
    /// The value is validated before any store access. Once the aggregate is
    /// persisted the call succeeds even if the cache cannot be invalidated.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, item_id = %item_id))]
    pub async fn rate(
        &self,
        user_id: UserId,
        item_id: ItemId,
        value: i64,
    ) -> CatalogResult<RateOutcome> {
        let value = RatingValue::new(value)?;
        let store = &self.backends.store;

        let exists = self
            .backends
            .call("store.item_exists", store.item_exists(item_id))
            .await?;
        if !exists {
            return Err(CatalogError::item_not_found(item_id));
        }

        self.upsert(user_id, item_id, value).await?;

        let aggregate = self
            .backends
            .call("store.rating_aggregate", store.rating_aggregate(item_id))
            .await?;
        let item = self
            .backends
            .call(
                "store.item_set_aggregate",
                store.item_set_aggregate(item_id, &aggregate),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(item_id))?;

        tracing::info!(
            value = value.get(),
            avg_rating = item.avg_rating,
            rating_count = item.rating_count,
            revision = aggregate.revision,
            "rating applied"
        );

        self.invalidate(item_id).await;

        Ok(RateOutcome {
            item,
            your_rating: value.get(),
        })
    }

    /// Insert the rating, or overwrite the existing one.
    ///
    /// A uniqueness conflict on insert means a concurrent first rate by the
    /// same user won the race; the value is then written through the update
    /// branch, so the last writer's value is the one kept.
    async fn upsert(&self, user_id: UserId, item_id: ItemId, value: RatingValue) -> CatalogResult<()> {
        let store = &self.backends.store;

        let updated = self
            .backends
            .call(
                "store.rating_update_value",
                store.rating_update_value(user_id, item_id, value),
            )
            .await?;
        if updated.is_some() {
            return Ok(());
        }

        let rating = Rating::new(user_id, item_id, value);
        match self
            .backends
            .call("store.rating_insert", store.rating_insert(&rating))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => {
                tracing::debug!("concurrent first rating, falling through to update");
                self.backends
                    .call(
                        "store.rating_update_value",
                        store.rating_update_value(user_id, item_id, value),
                    )
                    .await?
                    .map(|_| ())
                    .ok_or(CatalogError::NotFound {
                        entity: EntityKind::Rating,
                        id: item_id.into(),
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Delete `item:<id>` with bounded retries.
    ///
    /// The work runs on its own task so it completes even if the caller is
    /// dropped mid-await; the caller still waits for it, so a successful
    /// invalidation is visible before `rate` returns.
    async fn invalidate(&self, item_id: ItemId) {
        let cache = self.backends.cache.clone();
        let policy = self.policy;
        let task = tokio::spawn(async move {
            invalidate_with_retry(&cache, &CacheKey::item(item_id), policy).await
        });
        if let Err(e) = task.await {
            tracing::error!(item_id = %item_id, error = %e, "cache invalidation task failed");
        }
    }
}

/// Returns whether the entry was invalidated.
pub async fn invalidate_with_retry(
    cache: &ResponseCache,
    key: &CacheKey,
    policy: InvalidationPolicy,
) -> bool {
    let mut delay = policy.backoff;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match with_deadline(policy.timeout, "cache.delete", cache.invalidate(key)).await {
            Ok(removed) => {
                tracing::debug!(cache_key = %key, removed, attempt, "item cache entry invalidated");
                return true;
            }
            Err(e) if attempt <= policy.retries => {
                tracing::warn!(cache_key = %key, attempt, error = %e, "cache invalidation failed, retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(e) => {
                tracing::error!(
                    cache_key = %key,
                    attempts = attempt,
                    error = %e,
                    "cache invalidation gave up; entry may be stale until its TTL"
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use snipvault_core::{Item, NewItem};
    use snipvault_storage::{
        CatalogStore, MemoryCacheBackend, MemoryDocumentStore, MemorySearchIndex,
    };
    use std::sync::Arc;

    async fn coordinator_with_item() -> (RatingCoordinator, Arc<MemoryDocumentStore>, ItemId) {
        let store = Arc::new(MemoryDocumentStore::new());
        let item = Item::from_new(NewItem::new("Quick sort"), Utc::now());
        store.item_insert(&item).await.unwrap();
        let backends = Backends {
            store: store.clone(),
            index: Arc::new(MemorySearchIndex::over(store.items_handle())),
            cache: ResponseCache::new(Arc::new(MemoryCacheBackend::new())),
            timeout: Duration::from_secs(1),
        };
        (
            RatingCoordinator::new(backends, &CatalogConfig::default()),
            store,
            item.item_id,
        )
    }

    #[tokio::test]
    async fn test_rate_out_of_range_touches_nothing() {
        let (coordinator, store, item_id) = coordinator_with_item().await;
        for bad in [0, 6, -1, 100] {
            let err = coordinator
                .rate(UserId::now_v7(), item_id, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)));
        }
        assert_eq!(store.rating_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_unknown_item_is_not_found() {
        let (coordinator, store, _) = coordinator_with_item().await;
        let err = coordinator
            .rate(UserId::now_v7(), ItemId::now_v7(), 4)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                entity: EntityKind::Item,
                ..
            }
        ));
        assert_eq!(store.rating_count(), 0);
    }

    #[tokio::test]
    async fn test_rerate_overwrites() {
        let (coordinator, store, item_id) = coordinator_with_item().await;
        let user = UserId::now_v7();

        coordinator.rate(user, item_id, 3).await.unwrap();
        let outcome = coordinator.rate(user, item_id, 5).await.unwrap();

        assert_eq!(outcome.your_rating, 5);
        assert_eq!(outcome.item.rating_count, 1);
        assert!((outcome.item.avg_rating - 5.0).abs() < f64::EPSILON);
        assert_eq!(store.rating_count(), 1);
    }

    #[tokio::test]
    async fn test_two_users_average() {
        let (coordinator, _, item_id) = coordinator_with_item().await;
        coordinator.rate(UserId::now_v7(), item_id, 4).await.unwrap();
        let outcome = coordinator.rate(UserId::now_v7(), item_id, 5).await.unwrap();
        assert_eq!(outcome.item.rating_count, 2);
        assert!((outcome.item.avg_rating - 4.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_invalidate_with_retry_succeeds_first_try() {
        let cache = ResponseCache::new(Arc::new(MemoryCacheBackend::new()));
        let policy = InvalidationPolicy {
            retries: 2,
            backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        };
        assert!(invalidate_with_retry(&cache, &CacheKey::item(ItemId::now_v7()), policy).await);
    }
}
