//! Document store: items, per-user ratings and favorites.
//!
//! The store is the source of truth. It owns the two uniqueness constraints
//! of the catalogue, one Rating and one Favorite per (user, item), and it is
//! the only place the per-item rating revision is advanced.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snipvault_core::{
    CatalogError, CatalogResult, Favorite, Item, ItemId, Rating, RatingAggregate, RatingValue,
    UserId,
};

/// Constraint names reported in `CatalogError::Conflict`.
pub mod constraints {
    pub const ITEM_PRIMARY_KEY: &str = "items(item_id)";
    pub const RATING_USER_ITEM: &str = "ratings(user_id, item_id)";
    pub const FAVORITE_USER_ITEM: &str = "favorites(user_id, item_id)";
}

/// Async document store contract.
///
/// Implementations must make `rating_insert` fail with
/// `CatalogError::Conflict` when a Rating for the same (user, item) already
/// exists, and must apply `item_set_aggregate` atomically so readers never
/// observe a mean from one computation next to a count from another.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ========================================================================
    // ITEM OPERATIONS
    // ========================================================================

    /// Insert a new item.
    async fn item_insert(&self, item: &Item) -> CatalogResult<()>;

    /// Remove an item that was never made searchable. Returns whether one
    /// was removed. Only ingestion rollback calls this; ratings and favorites
    /// of the item are not touched.
    async fn item_delete(&self, id: ItemId) -> CatalogResult<bool>;

    /// Get an item by id.
    async fn item_get(&self, id: ItemId) -> CatalogResult<Option<Item>>;

    /// Get several items, preserving the order of `ids`. Unknown ids are
    /// skipped.
    async fn item_get_many(&self, ids: &[ItemId]) -> CatalogResult<Vec<Item>>;

    /// Whether an item exists.
    async fn item_exists(&self, id: ItemId) -> CatalogResult<bool>;

    /// Number of catalogued items.
    async fn item_count(&self) -> CatalogResult<u64>;

    /// Persist a recomputed aggregate onto the item.
    ///
    /// The write is skipped when the item already carries an aggregate from
    /// a newer rating revision. Returns the item as stored after the call,
    /// or `None` when the item does not exist.
    async fn item_set_aggregate(
        &self,
        id: ItemId,
        aggregate: &RatingAggregate,
    ) -> CatalogResult<Option<Item>>;

    // ========================================================================
    // RATING OPERATIONS
    // ========================================================================

    /// Get one user's rating of one item.
    async fn rating_get(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<Option<Rating>>;

    /// Insert a first rating. Fails with `Conflict` if one already exists.
    async fn rating_insert(&self, rating: &Rating) -> CatalogResult<()>;

    /// Overwrite the value of an existing rating. Returns `None` if there is
    /// no rating for the pair.
    async fn rating_update_value(
        &self,
        user_id: UserId,
        item_id: ItemId,
        value: RatingValue,
    ) -> CatalogResult<Option<Rating>>;

    /// Compute the aggregate over every rating of the item, stamped with the
    /// revision it was computed at.
    async fn rating_aggregate(&self, item_id: ItemId) -> CatalogResult<RatingAggregate>;

    /// Look up a user's ratings for a batch of items.
    async fn rating_values_for_user(
        &self,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> CatalogResult<HashMap<ItemId, RatingValue>>;

    // ========================================================================
    // FAVORITE OPERATIONS
    // ========================================================================

    /// Insert a favorite. Fails with `Conflict` if it already exists.
    async fn favorite_insert(&self, favorite: &Favorite) -> CatalogResult<()>;

    /// Delete a favorite. Returns whether one was removed.
    async fn favorite_delete(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<bool>;

    /// All favorites of a user, newest first.
    async fn favorite_list_by_user(&self, user_id: UserId) -> CatalogResult<Vec<Favorite>>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Cheap liveness check.
    async fn health_check(&self) -> CatalogResult<()>;
}

// ============================================================================
// IN-MEMORY DOCUMENT STORE
// ============================================================================

/// Ratings of one item plus the revision counter advanced by every write.
#[derive(Debug, Default)]
struct ItemRatings {
    records: HashMap<UserId, Rating>,
    revision: u64,
}

/// In-memory document store backed by sharded concurrent maps.
///
/// Each operation touches a single map entry at a time, and the entry guard
/// is the critical section: an aggregate is computed under the same guard
/// that rating writes take, so it always reflects every write up to its
/// revision.
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    items: Arc<DashMap<ItemId, Item>>,
    ratings: Arc<DashMap<ItemId, ItemRatings>>,
    favorites: Arc<DashMap<UserId, HashMap<ItemId, Favorite>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the item map, used by the in-memory search index so
    /// scans see live aggregates without a second copy.
    pub fn items_handle(&self) -> Arc<DashMap<ItemId, Item>> {
        Arc::clone(&self.items)
    }

    /// Total number of rating records across all items.
    pub fn rating_count(&self) -> usize {
        self.ratings.iter().map(|entry| entry.records.len()).sum()
    }

    /// Total number of favorites across all users.
    pub fn favorite_count(&self) -> usize {
        self.favorites.iter().map(|entry| entry.len()).sum()
    }
}

#[async_trait]
impl CatalogStore for MemoryDocumentStore {
    async fn item_insert(&self, item: &Item) -> CatalogResult<()> {
        match self.items.entry(item.item_id) {
            Entry::Occupied(_) => Err(CatalogError::conflict(constraints::ITEM_PRIMARY_KEY)),
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
                Ok(())
            }
        }
    }

    async fn item_delete(&self, id: ItemId) -> CatalogResult<bool> {
        Ok(self.items.remove(&id).is_some())
    }

    async fn item_get(&self, id: ItemId) -> CatalogResult<Option<Item>> {
        Ok(self.items.get(&id).map(|item| item.value().clone()))
    }

    async fn item_get_many(&self, ids: &[ItemId]) -> CatalogResult<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| item.value().clone()))
            .collect())
    }

    async fn item_exists(&self, id: ItemId) -> CatalogResult<bool> {
        Ok(self.items.contains_key(&id))
    }

    async fn item_count(&self) -> CatalogResult<u64> {
        Ok(self.items.len() as u64)
    }

    async fn item_set_aggregate(
        &self,
        id: ItemId,
        aggregate: &RatingAggregate,
    ) -> CatalogResult<Option<Item>> {
        let Some(mut item) = self.items.get_mut(&id) else {
            return Ok(None);
        };
        if aggregate.supersedes(item.aggregate_revision) {
            item.apply_aggregate(aggregate);
        }
        Ok(Some(item.value().clone()))
    }

    async fn rating_get(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<Option<Rating>> {
        Ok(self
            .ratings
            .get(&item_id)
            .and_then(|entry| entry.records.get(&user_id).cloned()))
    }

    async fn rating_insert(&self, rating: &Rating) -> CatalogResult<()> {
        let mut entry = self.ratings.entry(rating.item_id).or_default();
        if entry.records.contains_key(&rating.user_id) {
            return Err(CatalogError::conflict(constraints::RATING_USER_ITEM));
        }
        entry.records.insert(rating.user_id, rating.clone());
        entry.revision += 1;
        Ok(())
    }

    async fn rating_update_value(
        &self,
        user_id: UserId,
        item_id: ItemId,
        value: RatingValue,
    ) -> CatalogResult<Option<Rating>> {
        let Some(mut entry) = self.ratings.get_mut(&item_id) else {
            return Ok(None);
        };
        let ItemRatings { records, revision } = &mut *entry;
        let Some(rating) = records.get_mut(&user_id) else {
            return Ok(None);
        };
        rating.value = value;
        rating.updated_at = Utc::now();
        *revision += 1;
        Ok(Some(rating.clone()))
    }

    async fn rating_aggregate(&self, item_id: ItemId) -> CatalogResult<RatingAggregate> {
        Ok(self
            .ratings
            .get(&item_id)
            .map(|entry| {
                RatingAggregate::from_values(
                    entry.records.values().map(|rating| rating.value),
                    entry.revision,
                )
            })
            .unwrap_or_default())
    }

    async fn rating_values_for_user(
        &self,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> CatalogResult<HashMap<ItemId, RatingValue>> {
        Ok(item_ids
            .iter()
            .filter_map(|item_id| {
                self.ratings
                    .get(item_id)
                    .and_then(|entry| entry.records.get(&user_id).map(|r| (*item_id, r.value)))
            })
            .collect())
    }

    async fn favorite_insert(&self, favorite: &Favorite) -> CatalogResult<()> {
        let mut entry = self.favorites.entry(favorite.user_id).or_default();
        if entry.contains_key(&favorite.item_id) {
            return Err(CatalogError::conflict(constraints::FAVORITE_USER_ITEM));
        }
        entry.insert(favorite.item_id, favorite.clone());
        Ok(())
    }

    async fn favorite_delete(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<bool> {
        Ok(self
            .favorites
            .get_mut(&user_id)
            .map(|mut entry| entry.remove(&item_id).is_some())
            .unwrap_or(false))
    }

    async fn favorite_list_by_user(&self, user_id: UserId) -> CatalogResult<Vec<Favorite>> {
        let mut favorites: Vec<Favorite> = self
            .favorites
            .get(&user_id)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default();
        favorites.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.item_id.cmp(&a.item_id))
        });
        Ok(favorites)
    }

    async fn health_check(&self) -> CatalogResult<()> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The aggregate always equals the mean over each user's latest
        /// value, and its revision counts every write.
        #[test]
        fn prop_aggregate_tracks_latest_values(
            writes in prop::collection::vec((0usize..6, 1i64..=5), 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryDocumentStore::new();
                let item_id = ItemId::now_v7();
                let users: Vec<UserId> = (0..6).map(|_| UserId::now_v7()).collect();
                let mut latest: HashMap<usize, i64> = HashMap::new();

                for (user_idx, raw) in &writes {
                    let user = users[*user_idx];
                    let value = RatingValue::new(*raw).unwrap();
                    if store.rating_update_value(user, item_id, value).await.unwrap().is_none() {
                        store.rating_insert(&Rating::new(user, item_id, value)).await.unwrap();
                    }
                    latest.insert(*user_idx, *raw);
                }

                let agg = store.rating_aggregate(item_id).await.unwrap();
                let expected_mean =
                    latest.values().sum::<i64>() as f64 / latest.len() as f64;
                prop_assert_eq!(agg.count, latest.len() as u64);
                prop_assert!((agg.mean - expected_mean).abs() < 1e-9);
                prop_assert_eq!(agg.revision, writes.len() as u64);
                Ok(())
            })?;
        }
    }
}
