//! Query planner: cache, relevance search or filtered scan.

use std::time::Duration;

use snipvault_core::{
    Caller, CatalogResult, Item, ItemId, ItemView, NormalizedQuery, PageLimits, SearchPage,
    SearchRequest,
};
use snipvault_storage::CacheKey;

use crate::config::CatalogConfig;
use crate::deadline::Backends;

/// How a page is produced on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Keyword present: weighted relevance, score desc then id asc.
    Relevance,
    /// No keyword: `rating_count` desc, `created_at` desc, id asc.
    Popularity,
}

/// Everything decided before touching a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: NormalizedQuery,
    pub strategy: SearchStrategy,
    /// Present only for anonymous callers.
    pub cache_key: Option<CacheKey>,
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    backends: Backends,
    limits: PageLimits,
    search_ttl: Duration,
}

impl QueryPlanner {
    pub fn new(backends: Backends, config: &CatalogConfig) -> Self {
        Self {
            backends,
            limits: config.page_limits(),
            search_ttl: config.search_ttl,
        }
    }

    /// Normalize the request and pick a strategy and cache key.
    pub fn plan(&self, request: &SearchRequest, caller: &Caller) -> QueryPlan {
        let query = NormalizedQuery::from_request(request, &self.limits);
        let strategy = if query.has_keyword() {
            SearchStrategy::Relevance
        } else {
            SearchStrategy::Popularity
        };
        let cache_key = (!caller.is_authenticated()).then(|| CacheKey::search(&query));
        QueryPlan {
            query,
            strategy,
            cache_key,
        }
    }

    /// Plan and execute in one step.
    pub async fn search(
        &self,
        request: &SearchRequest,
        caller: &Caller,
    ) -> CatalogResult<SearchPage<ItemView>> {
        let plan = self.plan(request, caller);
        self.execute(&plan, caller).await
    }

    /// Serve a plan.
    ///
    /// Cache failures are logged and degrade to an uncached answer; index and
    /// store failures propagate.
    #[tracing::instrument(skip_all, fields(strategy = ?plan.strategy, cached = plan.cache_key.is_some()))]
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        caller: &Caller,
    ) -> CatalogResult<SearchPage<ItemView>> {
        if let Some(key) = &plan.cache_key {
            match self
                .backends
                .call("cache.get", self.backends.cache.get_json::<SearchPage<Item>>(key))
                .await
            {
                Ok(Some(read)) => {
                    tracing::debug!(cache_key = %key, age_ms = read.age().as_millis() as u64, "search cache hit");
                    return Ok(read.into_value().map(ItemView::anonymous));
                }
                Ok(None) => tracing::debug!(cache_key = %key, "search cache miss"),
                Err(e) => {
                    tracing::warn!(cache_key = %key, error = %e, "search cache read failed, querying index")
                }
            }
        }

        let page = self.compute_page(plan).await?;

        if let Some(key) = &plan.cache_key {
            if let Err(e) = self
                .backends
                .call(
                    "cache.set",
                    self.backends.cache.put_json(key, &page, self.search_ttl),
                )
                .await
            {
                tracing::warn!(cache_key = %key, error = %e, "search cache write failed");
            }
        }

        match caller.user_id() {
            Some(user_id) => {
                let ids: Vec<ItemId> = page.items.iter().map(|item| item.item_id).collect();
                let mut ratings = self
                    .backends
                    .call(
                        "store.rating_values_for_user",
                        self.backends.store.rating_values_for_user(user_id, &ids),
                    )
                    .await?;
                Ok(page.map(|item| {
                    let rating = ratings.remove(&item.item_id);
                    ItemView::with_rating(item, rating)
                }))
            }
            None => Ok(page.map(ItemView::anonymous)),
        }
    }

    /// Count and fetch one page with identical filters.
    async fn compute_page(&self, plan: &QueryPlan) -> CatalogResult<SearchPage<Item>> {
        let query = &plan.query;
        let window = query.window();
        let backends = &self.backends;

        let count = backends.call(
            "index.count",
            backends.index.count(&query.terms, &query.filters),
        );
        let ids = async {
            match plan.strategy {
                SearchStrategy::Relevance => backends
                    .call(
                        "index.search",
                        backends.index.search(&query.terms, &query.filters, window),
                    )
                    .await
                    .map(|hits| hits.into_iter().map(|hit| hit.item_id).collect::<Vec<_>>()),
                SearchStrategy::Popularity => {
                    backends
                        .call(
                            "index.scan",
                            backends.index.scan(&query.filters, window),
                        )
                        .await
                }
            }
        };
        let (total, ids) = tokio::try_join!(count, ids)?;

        let items = backends
            .call("store.item_get_many", backends.store.item_get_many(&ids))
            .await?;

        Ok(SearchPage {
            total,
            page: query.page,
            page_size: query.page_size,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipvault_core::UserId;
    use snipvault_storage::{MemoryCacheBackend, MemoryDocumentStore, MemorySearchIndex, ResponseCache};
    use std::sync::Arc;

    fn planner() -> QueryPlanner {
        let store = MemoryDocumentStore::new();
        let index = MemorySearchIndex::over(store.items_handle());
        let backends = Backends {
            store: Arc::new(store),
            index: Arc::new(index),
            cache: ResponseCache::new(Arc::new(MemoryCacheBackend::new())),
            timeout: Duration::from_secs(1),
        };
        QueryPlanner::new(backends, &CatalogConfig::default())
    }

    #[test]
    fn test_plan_keyword_uses_relevance() {
        let plan = planner().plan(&SearchRequest::new().keyword("sort"), &Caller::Anonymous);
        assert_eq!(plan.strategy, SearchStrategy::Relevance);
        assert!(plan.cache_key.is_some());
    }

    #[test]
    fn test_plan_blank_keyword_uses_popularity() {
        let plan = planner().plan(&SearchRequest::new().keyword("   "), &Caller::Anonymous);
        assert_eq!(plan.strategy, SearchStrategy::Popularity);
    }

    #[test]
    fn test_plan_authenticated_has_no_cache_key() {
        let caller = Caller::User(UserId::now_v7());
        let plan = planner().plan(&SearchRequest::new().keyword("sort"), &caller);
        assert!(plan.cache_key.is_none());
    }

    #[test]
    fn test_plan_clamps_pages() {
        let plan = planner().plan(
            &SearchRequest::new().page(-3).page_size(1000),
            &Caller::Anonymous,
        );
        assert_eq!(plan.query.page, 1);
        assert_eq!(plan.query.page_size, 50);
    }

    #[tokio::test]
    async fn test_empty_catalog_returns_empty_page() {
        let page = planner()
            .search(&SearchRequest::new().keyword("anything"), &Caller::Anonymous)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
    }
}
