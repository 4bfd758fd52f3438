//! Snipvault Core - Entity Types
//!
//! Pure data structures shared by the storage and catalog crates: typed ids,
//! catalogue entities, the error hierarchy, search request normalization and
//! the tokenizer both indexing and querying rely on.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod query;
pub mod tokenizer;

pub use config::FieldWeights;
pub use entities::{EntityKind, Favorite, Item, NewItem, Rating, RatingAggregate, RatingValue};
pub use error::{CatalogError, CatalogResult, ConfigError, UpstreamError, ValidationError};
pub use identity::{parse_id, Caller, EntityIdType, ItemId, Timestamp, UserId};
pub use query::{
    NormalizedQuery, PageLimits, PageWindow, SearchFilters, SearchPage, SearchRequest,
};
pub use tokenizer::{normalize_keyword, tokenize};

use serde::{Deserialize, Serialize};

/// An item as returned to a caller.
///
/// `your_rating` is only present for authenticated callers who have rated
/// the item. Shared cache entries never carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_rating: Option<u8>,
}

impl ItemView {
    pub fn anonymous(item: Item) -> Self {
        Self {
            item,
            your_rating: None,
        }
    }

    pub fn with_rating(item: Item, rating: Option<RatingValue>) -> Self {
        Self {
            item,
            your_rating: rating.map(RatingValue::get),
        }
    }
}

/// Result of a successful rate call: the item with its fresh aggregate and
/// the caller's own value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateOutcome {
    pub item: Item,
    pub your_rating: u8,
}
