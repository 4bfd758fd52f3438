//! Snipvault Test Utilities
//!
//! Centralized test infrastructure for the Snipvault workspace:
//! - Cache and index doubles that fail, stall or recover on demand
//! - Proptest generators for entities and search requests
//! - Fixtures for common catalogue shapes
//! - Assertions for the error hierarchy

pub use snipvault_core::{
    CatalogError, CatalogResult, EntityKind, Item, ItemId, NewItem, RatingValue, SearchRequest,
    Timestamp, UpstreamError, UserId, ValidationError,
};
pub use snipvault_storage::{MemoryCacheBackend, MemoryDocumentStore, MemorySearchIndex};

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use snipvault_core::{PageWindow, SearchFilters};
use snipvault_storage::{CacheBackend, CacheKey, CacheStats, CachedPayload, ScoredHit, SearchIndex};

// ============================================================================
// BACKEND DOUBLES
// ============================================================================

fn cache_down() -> CatalogError {
    UpstreamError::CacheUnavailable {
        reason: "connection refused".to_string(),
    }
    .into()
}

/// A cache tier that is down: every call fails.
#[derive(Debug, Default)]
pub struct FailingCacheBackend {
    calls: AtomicU64,
}

impl FailingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many calls were attempted.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn fail<T>(&self) -> CatalogResult<T> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(cache_down())
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &CacheKey) -> CatalogResult<Option<CachedPayload>> {
        self.fail()
    }

    async fn set(&self, _key: &CacheKey, _payload: CachedPayload, _ttl: Duration) -> CatalogResult<()> {
        self.fail()
    }

    async fn set_if_unchanged(
        &self,
        _key: &CacheKey,
        _payload: CachedPayload,
        _ttl: Duration,
        _generation: u64,
    ) -> CatalogResult<bool> {
        self.fail()
    }

    async fn generation(&self, _key: &CacheKey) -> CatalogResult<u64> {
        self.fail()
    }

    async fn delete(&self, _key: &CacheKey) -> CatalogResult<bool> {
        self.fail()
    }

    async fn stats(&self) -> CatalogResult<CacheStats> {
        self.fail()
    }
}

/// A working in-memory cache whose `delete` fails a fixed number of times
/// before recovering.
#[derive(Debug)]
pub struct FlakyCacheBackend {
    inner: MemoryCacheBackend,
    failures_left: AtomicU32,
    delete_attempts: AtomicU32,
}

impl FlakyCacheBackend {
    pub fn failing_deletes(failures: u32) -> Self {
        Self {
            inner: MemoryCacheBackend::new(),
            failures_left: AtomicU32::new(failures),
            delete_attempts: AtomicU32::new(0),
        }
    }

    pub fn delete_attempts(&self) -> u32 {
        self.delete_attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    async fn get(&self, key: &CacheKey) -> CatalogResult<Option<CachedPayload>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, payload: CachedPayload, ttl: Duration) -> CatalogResult<()> {
        self.inner.set(key, payload, ttl).await
    }

    async fn set_if_unchanged(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
        generation: u64,
    ) -> CatalogResult<bool> {
        self.inner.set_if_unchanged(key, payload, ttl, generation).await
    }

    async fn generation(&self, key: &CacheKey) -> CatalogResult<u64> {
        self.inner.generation(key).await
    }

    async fn delete(&self, key: &CacheKey) -> CatalogResult<bool> {
        self.delete_attempts.fetch_add(1, Ordering::Relaxed);
        let failed = self
            .failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(cache_down());
        }
        self.inner.delete(key).await
    }

    async fn stats(&self) -> CatalogResult<CacheStats> {
        self.inner.stats().await
    }
}

/// A cache tier that never answers reads; writes and deletes pass through.
#[derive(Debug, Default)]
pub struct StalledCacheBackend {
    inner: MemoryCacheBackend,
}

impl StalledCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for StalledCacheBackend {
    async fn get(&self, _key: &CacheKey) -> CatalogResult<Option<CachedPayload>> {
        std::future::pending::<CatalogResult<Option<CachedPayload>>>().await
    }

    async fn set(&self, key: &CacheKey, payload: CachedPayload, ttl: Duration) -> CatalogResult<()> {
        self.inner.set(key, payload, ttl).await
    }

    async fn set_if_unchanged(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
        generation: u64,
    ) -> CatalogResult<bool> {
        self.inner.set_if_unchanged(key, payload, ttl, generation).await
    }

    async fn generation(&self, key: &CacheKey) -> CatalogResult<u64> {
        self.inner.generation(key).await
    }

    async fn delete(&self, key: &CacheKey) -> CatalogResult<bool> {
        self.inner.delete(key).await
    }

    async fn stats(&self) -> CatalogResult<CacheStats> {
        self.inner.stats().await
    }
}

/// A search index that is down.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableIndex;

impl UnavailableIndex {
    fn fail<T>() -> CatalogResult<T> {
        Err(UpstreamError::IndexUnavailable {
            reason: "index offline".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl SearchIndex for UnavailableIndex {
    async fn index_item(&self, _item: &Item) -> CatalogResult<()> {
        Self::fail()
    }

    async fn search(
        &self,
        _terms: &[String],
        _filters: &SearchFilters,
        _window: PageWindow,
    ) -> CatalogResult<Vec<ScoredHit>> {
        Self::fail()
    }

    async fn scan(
        &self,
        _filters: &SearchFilters,
        _window: PageWindow,
    ) -> CatalogResult<Vec<ItemId>> {
        Self::fail()
    }

    async fn count(&self, _terms: &[String], _filters: &SearchFilters) -> CatalogResult<u64> {
        Self::fail()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Snipvault types.

    use super::*;
    use proptest::prelude::*;

    pub const LANGUAGES: &[&str] = &["python", "rust", "go", "sql", "bash"];
    pub const TAGS: &[&str] = &["api", "db", "cli", "testing", "utils"];

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        Just(()).prop_map(|_| UserId::now_v7())
    }

    /// A valid rating value, 1..=5.
    pub fn arb_rating() -> impl Strategy<Value = i64> {
        1i64..=5
    }

    /// Anything outside 1..=5.
    pub fn arb_out_of_range_rating() -> impl Strategy<Value = i64> {
        prop_oneof![i64::MIN..1, 6i64..=i64::MAX]
    }

    /// A lowercase word that survives tokenization.
    pub fn arb_word() -> impl Strategy<Value = String> {
        "[a-z]{3,8}"
    }

    pub fn arb_new_item() -> impl Strategy<Value = NewItem> {
        (
            prop::collection::vec(arb_word(), 1..4),
            arb_word(),
            prop::sample::select(LANGUAGES),
            prop::collection::vec(prop::sample::select(TAGS), 0..3),
            arb_word(),
        )
            .prop_map(|(title, description, language, tags, body)| {
                NewItem::new(title.join(" "))
                    .with_description(description)
                    .with_language(language)
                    .with_tags(tags)
                    .with_body(body)
            })
    }

    /// A search request with arbitrary, possibly out-of-range paging.
    pub fn arb_search_request() -> impl Strategy<Value = SearchRequest> {
        (
            proptest::option::of("[a-zA-Z ,.:=%-]{0,24}"),
            proptest::option::of(prop::sample::select(LANGUAGES)),
            proptest::option::of(prop::sample::select(TAGS)),
            proptest::option::of(-5i64..20),
            proptest::option::of(-5i64..200),
        )
            .prop_map(|(keyword, language, tag, page, page_size)| SearchRequest {
                keyword,
                language: language.map(str::to_string),
                tag: tag.map(str::to_string),
                page,
                page_size,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made payloads.

    use super::*;

    /// A Python snippet about sorting.
    pub fn sample_item() -> NewItem {
        NewItem::new("Quick sort in Python")
            .with_description("Recursive quicksort")
            .with_language("python")
            .with_tags(["algorithms", "sorting"])
            .with_body("def quicksort(xs):\n    return xs")
    }

    /// `n` distinct Python snippets, all matching the keyword `python`.
    pub fn python_items(n: usize) -> Vec<NewItem> {
        (1..=n)
            .map(|i| {
                NewItem::new(format!("python snippet {i}"))
                    .with_description(format!("helper number {i}"))
                    .with_language("python")
                    .with_tags(["utils"])
                    .with_body(format!("def helper_{i}():\n    pass"))
            })
            .collect()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over `CatalogResult`.

    use super::*;

    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        assert!(
            matches!(result, Err(CatalogError::Validation(_))),
            "Expected validation error, got {:?}",
            result
        );
    }

    pub fn assert_out_of_range<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        assert!(
            matches!(
                result,
                Err(CatalogError::Validation(ValidationError::RatingOutOfRange { .. }))
            ),
            "Expected rating out of range, got {:?}",
            result
        );
    }

    pub fn assert_not_found<T: std::fmt::Debug>(result: &CatalogResult<T>, kind: EntityKind) {
        match result {
            Err(CatalogError::NotFound { entity, .. }) => assert_eq!(*entity, kind),
            other => panic!("Expected {kind:?} not found, got {other:?}"),
        }
    }

    pub fn assert_upstream<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        assert!(
            matches!(result, Err(CatalogError::Upstream(_))),
            "Expected upstream error, got {:?}",
            result
        );
    }

    /// `avg_rating` equals the mean of `values`, and `rating_count` their
    /// number.
    pub fn assert_aggregate(item: &Item, values: &[u8]) {
        assert_eq!(item.rating_count, values.len() as u64, "rating_count");
        let expected = if values.is_empty() {
            0.0
        } else {
            values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64
        };
        assert!(
            (item.avg_rating - expected).abs() < 1e-9,
            "avg_rating {} != {}",
            item.avg_rating,
            expected
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_failing_cache_counts_calls() {
        let cache = FailingCacheBackend::new();
        let key = CacheKey::item(ItemId::now_v7());
        assert!(cache.get(&key).await.is_err());
        assert!(cache.delete(&key).await.is_err());
        assert_eq!(cache.calls(), 2);
    }

    #[tokio::test]
    async fn test_flaky_cache_recovers() {
        let cache = FlakyCacheBackend::failing_deletes(2);
        let key = CacheKey::item(ItemId::now_v7());
        assert!(cache.delete(&key).await.is_err());
        assert!(cache.delete(&key).await.is_err());
        assert!(cache.delete(&key).await.is_ok());
        assert_eq!(cache.delete_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_cache_never_answers() {
        let cache = StalledCacheBackend::new();
        let key = CacheKey::item(ItemId::now_v7());
        let read = tokio::time::timeout(Duration::from_secs(1), cache.get(&key)).await;
        assert!(read.is_err());
    }

    #[test]
    fn test_python_items_are_distinct() {
        let items = fixtures::python_items(5);
        assert_eq!(items.len(), 5);
        assert_ne!(items[0].title, items[1].title);
    }

    #[test]
    fn test_assert_aggregate_empty() {
        let item = Item::from_new(fixtures::sample_item(), chrono::Utc::now());
        assertions::assert_aggregate(&item, &[]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_item_is_valid(new_item in generators::arb_new_item()) {
            prop_assert!(new_item.normalized().is_ok());
        }

        #[test]
        fn prop_generated_rating_is_accepted(value in generators::arb_rating()) {
            prop_assert!(RatingValue::new(value).is_ok());
        }

        #[test]
        fn prop_out_of_range_rating_is_rejected(value in generators::arb_out_of_range_rating()) {
            prop_assert!(RatingValue::new(value).is_err());
        }
    }
}
