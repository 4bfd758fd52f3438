//! Error types for Snipvault operations

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::EntityKind;

/// Validation errors. Raised before any store access, so they never have
/// side effects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Rating value {value} is out of range, expected an integer from 1 to 5")]
    RatingOutOfRange { value: i64 },

    #[error("Malformed {field}: {value:?}")]
    MalformedId { field: String, value: String },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },
}

/// A backing service could not serve the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Document store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Cache tier unavailable: {reason}")]
    CacheUnavailable { reason: String },

    #[error("Search index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    #[error("Payload could not be (de)serialized: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Snipvault errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity:?} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    /// A uniqueness constraint rejected an insert. Callers decide whether
    /// this is success-by-idempotence or a fall-through to update.
    #[error("Constraint {constraint} violated")]
    Conflict { constraint: String },

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

impl CatalogError {
    /// Shorthand for a not-found item.
    pub fn item_not_found(id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity: EntityKind::Item,
            id: id.into(),
        }
    }

    /// Shorthand for a uniqueness violation.
    pub fn conflict(constraint: impl Into<String>) -> Self {
        Self::Conflict {
            constraint: constraint.into(),
        }
    }

    /// Whether this error is a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Upstream(UpstreamError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Result type alias for Snipvault operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// TESTS
// =============================================================================
