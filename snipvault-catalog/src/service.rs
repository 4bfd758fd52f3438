//! `CatalogService`: the surface external transports call into.

use std::sync::Arc;

use chrono::Utc;
use snipvault_core::{
    parse_id, Caller, CatalogError, CatalogResult, Item, ItemId, ItemView, NewItem, RateOutcome,
    SearchPage, SearchRequest, UserId,
};
use snipvault_storage::{
    CacheBackend, CacheKey, CacheStats, CatalogStore, MemoryCacheBackend, MemoryDocumentStore,
    MemorySearchIndex, ResponseCache, SearchIndex,
};

use crate::config::CatalogConfig;
use crate::deadline::Backends;
use crate::favorites::FavoriteService;
use crate::planner::QueryPlanner;
use crate::rating::RatingCoordinator;

/// Parse an item id supplied as a string. Malformed ids are a
/// `Validation` error.
pub fn parse_item_id(raw: &str) -> CatalogResult<ItemId> {
    Ok(parse_id(raw)?)
}

/// Parse a user id supplied as a string.
pub fn parse_user_id(raw: &str) -> CatalogResult<UserId> {
    Ok(parse_id(raw)?)
}

/// Search-and-rating core of the catalogue.
///
/// Cheap to clone; clones share the same backends.
#[derive(Debug, Clone)]
pub struct CatalogService {
    backends: Backends,
    config: Arc<CatalogConfig>,
    planner: QueryPlanner,
    ratings: RatingCoordinator,
    favorites: FavoriteService,
}

impl CatalogService {
    /// Wire the service over arbitrary backends. The configuration is
    /// validated first.
    pub fn new(
        store: Arc<dyn CatalogStore>,
        index: Arc<dyn SearchIndex>,
        cache: Arc<dyn CacheBackend>,
        config: CatalogConfig,
    ) -> CatalogResult<Self> {
        config.validate()?;
        let backends = Backends {
            store,
            index,
            cache: ResponseCache::new(cache),
            timeout: config.backend_timeout,
        };
        Ok(Self {
            planner: QueryPlanner::new(backends.clone(), &config),
            ratings: RatingCoordinator::new(backends.clone(), &config),
            favorites: FavoriteService::new(backends.clone(), &config),
            backends,
            config: Arc::new(config),
        })
    }

    /// Fully in-memory service.
    pub fn in_memory(config: CatalogConfig) -> CatalogResult<Self> {
        Self::in_memory_with_cache(config, Arc::new(MemoryCacheBackend::new()))
    }

    /// In-memory store and index over a caller-supplied cache tier.
    pub fn in_memory_with_cache(
        config: CatalogConfig,
        cache: Arc<dyn CacheBackend>,
    ) -> CatalogResult<Self> {
        let store = MemoryDocumentStore::new();
        let index = MemorySearchIndex::with_weights(store.items_handle(), config.field_weights);
        Self::new(Arc::new(store), Arc::new(index), cache, config)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Search the catalogue. Anonymous pages are served from and written to
    /// the search cache; authenticated pages never touch it and carry the
    /// caller's own ratings.
    pub async fn search_items(
        &self,
        request: SearchRequest,
        caller: Caller,
    ) -> CatalogResult<SearchPage<ItemView>> {
        self.planner.search(&request, &caller).await
    }

    /// Get one item, read through the `item:<id>` entry.
    ///
    /// The key's generation is read before the store, so a value fetched
    /// before a concurrent invalidation is never written back.
    #[tracing::instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: ItemId) -> CatalogResult<Item> {
        let key = CacheKey::item(item_id);
        let cache = &self.backends.cache;

        match self
            .backends
            .call("cache.get", cache.get_json::<Item>(&key))
            .await
        {
            Ok(Some(read)) => {
                tracing::debug!(cache_key = %key, age_ms = read.age().as_millis() as u64, "item cache hit");
                return Ok(read.into_value());
            }
            Ok(None) => tracing::debug!(cache_key = %key, "item cache miss"),
            Err(e) => tracing::warn!(cache_key = %key, error = %e, "item cache read failed"),
        }

        let generation = match self
            .backends
            .call("cache.generation", cache.generation(&key))
            .await
        {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "item cache generation unavailable");
                None
            }
        };

        let item = self
            .backends
            .call("store.item_get", self.backends.store.item_get(item_id))
            .await?
            .ok_or_else(|| CatalogError::item_not_found(item_id))?;

        if let Some(generation) = generation {
            match self
                .backends
                .call(
                    "cache.set",
                    cache.put_json_if_unchanged(&key, &item, self.config.item_ttl, generation),
                )
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::debug!(cache_key = %key, "item invalidated during read, not caching"),
                Err(e) => tracing::warn!(cache_key = %key, error = %e, "item cache write failed"),
            }
        }

        Ok(item)
    }

    /// The user's rating of the item, if any.
    pub async fn get_user_rating(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> CatalogResult<Option<u8>> {
        let rating = self
            .backends
            .call(
                "store.rating_get",
                self.backends.store.rating_get(user_id, item_id),
            )
            .await?;
        Ok(rating.map(|r| r.value.get()))
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Rate an item 1..=5. See [`RatingCoordinator::rate`].
    pub async fn rate(
        &self,
        user_id: UserId,
        item_id: ItemId,
        value: i64,
    ) -> CatalogResult<RateOutcome> {
        self.ratings.rate(user_id, item_id, value).await
    }

    pub async fn favorite(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<()> {
        self.favorites.favorite(user_id, item_id).await
    }

    pub async fn unfavorite(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<()> {
        self.favorites.unfavorite(user_id, item_id).await
    }

    pub async fn list_favorites(
        &self,
        user_id: UserId,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> CatalogResult<SearchPage<ItemView>> {
        self.favorites
            .list_favorites(user_id, page, page_size)
            .await
    }

    /// Add a snippet to the catalogue with an empty aggregate and make it
    /// searchable.
    ///
    /// If indexing fails the store insert is rolled back, so a failed ingest
    /// leaves nothing behind and can simply be retried.
    pub async fn ingest(&self, new_item: NewItem) -> CatalogResult<Item> {
        let item = Item::from_new(new_item.normalized()?, Utc::now());
        let store = &self.backends.store;
        self.backends
            .call("store.item_insert", store.item_insert(&item))
            .await?;

        if let Err(e) = self
            .backends
            .call("index.index_item", self.backends.index.index_item(&item))
            .await
        {
            match self
                .backends
                .call("store.item_delete", store.item_delete(item.item_id))
                .await
            {
                Ok(_) => {
                    tracing::warn!(item_id = %item.item_id, error = %e, "indexing failed, ingest rolled back")
                }
                Err(rollback) => tracing::error!(
                    item_id = %item.item_id,
                    error = %e,
                    rollback_error = %rollback,
                    "indexing failed and rollback failed, item is stored but unsearchable"
                ),
            }
            return Err(e);
        }

        tracing::info!(item_id = %item.item_id, language = %item.language, "item ingested");
        Ok(item)
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    pub async fn cache_stats(&self) -> CatalogResult<CacheStats> {
        self.backends
            .call("cache.stats", self.backends.cache.stats())
            .await
    }

    /// Check that the document store answers.
    pub async fn health_check(&self) -> CatalogResult<()> {
        self.backends
            .call("store.health_check", self.backends.store.health_check())
            .await
    }
}
