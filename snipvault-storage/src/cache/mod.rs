//! Cache tier: TTL key/value entries memoizing anonymous search pages and
//! single-item lookups.
//!
//! Keys are built only from normalized inputs ([`CacheKey`]), hits carry
//! the time they were written ([`CacheRead`]), and each key carries
//! a generation so a miss that raced an invalidation cannot re-populate the
//! entry with pre-invalidation data.

pub mod freshness;
pub mod key;
pub mod memory;
pub mod response;
pub mod traits;

pub use freshness::CacheRead;
pub use key::{CacheKey, CacheNamespace};
pub use memory::MemoryCacheBackend;
pub use response::ResponseCache;
pub use traits::{CacheBackend, CacheStats, CachedPayload};
