//! Snipvault Storage
//!
//! The three backing services of the catalogue behind async traits, each
//! with an in-memory implementation:
//!
//! - [`CatalogStore`]: items, ratings and favorites, the source of truth
//! - [`SearchIndex`]: weighted full-text relevance search and filtered scans
//! - [`cache::CacheBackend`]: TTL entries for search pages and item lookups

pub mod cache;
pub mod search;
pub mod store;

pub use cache::{
    CacheBackend, CacheKey, CacheNamespace, CacheRead, CacheStats, CachedPayload,
    MemoryCacheBackend, ResponseCache,
};
pub use search::{MemorySearchIndex, ScoredHit, SearchIndex};
pub use store::{constraints, CatalogStore, MemoryDocumentStore};
