//! Error codes for the transport layer.
//!
//! The catalog returns `CatalogError`. Whatever transport sits in front of
//! it (HTTP, RPC) renders failures through [`ErrorCode`] and [`ErrorBody`],
//! which carry a stable machine-readable code and the status to send.

use serde::{Deserialize, Serialize};
use snipvault_core::{CatalogError, UpstreamError, ValidationError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for catalog responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// An id could not be parsed
    InvalidId,

    /// Rating value outside 1..=5
    InvalidRange,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// A uniqueness constraint rejected the write
    EntityAlreadyExists,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Server misconfiguration
    InternalError,

    /// A backing service is unavailable
    ServiceUnavailable,

    /// A backing call exceeded its deadline
    Timeout,
}

impl ErrorCode {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidId | ErrorCode::InvalidRange | ErrorCode::MissingField => 400,

            ErrorCode::EntityNotFound => 404,

            ErrorCode::EntityAlreadyExists => 409,

            ErrorCode::InternalError => 500,
            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::Timeout => 504,
        }
    }

    /// Default human-readable message.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "Invalid id",
            ErrorCode::InvalidRange => "Value is out of valid range",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Upstream call timed out",
        }
    }
}

impl From<&CatalogError> for ErrorCode {
    fn from(err: &CatalogError) -> Self {
        match err {
            CatalogError::Validation(ValidationError::MalformedId { .. }) => ErrorCode::InvalidId,
            CatalogError::Validation(ValidationError::RatingOutOfRange { .. }) => {
                ErrorCode::InvalidRange
            }
            CatalogError::Validation(ValidationError::RequiredFieldMissing { .. }) => {
                ErrorCode::MissingField
            }
            CatalogError::NotFound { .. } => ErrorCode::EntityNotFound,
            CatalogError::Conflict { .. } => ErrorCode::EntityAlreadyExists,
            CatalogError::Upstream(UpstreamError::Serialization { .. }) => ErrorCode::InternalError,
            CatalogError::Upstream(_) => ErrorCode::ServiceUnavailable,
            CatalogError::Config(_) => ErrorCode::InternalError,
            CatalogError::Timeout { .. } => ErrorCode::Timeout,
        }
    }
}

// ============================================================================
// ERROR BODY
// ============================================================================

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }
}

impl From<&CatalogError> for ErrorBody {
    fn from(err: &CatalogError) -> Self {
        let code = ErrorCode::from(err);
        match code {
            // Backend details stay in the logs.
            ErrorCode::InternalError | ErrorCode::ServiceUnavailable => Self::from_code(code),
            _ => Self::new(code, err.to_string()),
        }
    }
}

impl From<CatalogError> for ErrorBody {
    fn from(err: CatalogError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipvault_core::{ConfigError, EntityKind};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                CatalogError::from(ValidationError::RatingOutOfRange { value: 9 }),
                400,
            ),
            (
                CatalogError::from(ValidationError::MalformedId {
                    field: "item_id".to_string(),
                    value: "x".to_string(),
                }),
                400,
            ),
            (
                CatalogError::NotFound {
                    entity: EntityKind::Item,
                    id: Uuid::nil(),
                },
                404,
            ),
            (CatalogError::conflict("favorites(user_id, item_id)"), 409),
            (
                CatalogError::from(UpstreamError::StoreUnavailable {
                    reason: "down".to_string(),
                }),
                503,
            ),
            (
                CatalogError::Timeout {
                    operation: "store.item_get".to_string(),
                    after: Duration::from_secs(1),
                },
                504,
            ),
            (
                CatalogError::from(ConfigError::InvalidValue {
                    field: "x".to_string(),
                    value: "y".to_string(),
                    reason: "z".to_string(),
                }),
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ErrorCode::from(&err).status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_malformed_id_maps_to_invalid_id() {
        let err = CatalogError::from(ValidationError::MalformedId {
            field: "item_id".to_string(),
            value: "nope".to_string(),
        });
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, ErrorCode::InvalidId);
        assert!(body.message.contains("nope"));
    }

    #[test]
    fn test_upstream_details_are_hidden() {
        let err = CatalogError::from(UpstreamError::CacheUnavailable {
            reason: "redis at 10.0.0.3 refused".to_string(),
        });
        let body = ErrorBody::from(err);
        assert_eq!(body.code, ErrorCode::ServiceUnavailable);
        assert_eq!(body.message, "Service temporarily unavailable");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::EntityNotFound).unwrap();
        assert_eq!(json, "\"ENTITY_NOT_FOUND\"");
    }
}
