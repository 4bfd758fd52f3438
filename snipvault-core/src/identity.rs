//! Identity types for Snipvault entities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour for strongly-typed entity identifiers.
///
/// Every id wraps a UUIDv7, so ids are timestamp-sortable and their `Ord`
/// gives a stable tiebreak for result ordering.
pub trait EntityIdType:
    Copy + Eq + Ord + std::hash::Hash + fmt::Display + FromStr<Err = ValidationError>
{
    /// Field name used in validation errors.
    const FIELD: &'static str;

    /// Wrap an existing UUID.
    fn from_uuid(uuid: Uuid) -> Self;

    /// Get the inner UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a new timestamp-sortable id.
    fn now_v7() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new timestamp-sortable id.
            pub fn now_v7() -> Self {
                <Self as EntityIdType>::now_v7()
            }

            /// Get the inner UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl EntityIdType for $name {
            const FIELD: &'static str = $field;

            fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::MalformedId {
                        field: $field.to_string(),
                        value: s.to_string(),
                    })
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a catalogued snippet.
    ItemId,
    "item_id"
);

define_entity_id!(
    /// Identifier of a user. Issued by the external credential service.
    UserId,
    "user_id"
);

/// Parse an id supplied by the transport layer.
///
/// Malformed ids are rejected before any store access.
pub fn parse_id<T: EntityIdType>(raw: &str) -> Result<T, ValidationError> {
    raw.parse()
}

/// Who is calling into the read path.
///
/// Caching policy depends on this capability rather than on transport
/// details: personalized responses are never written to a shared entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Caller {
    /// No credentials presented.
    #[default]
    Anonymous,
    /// A verified user.
    User(UserId),
}

impl Caller {
    /// Whether the caller presented verified credentials.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// The user id, if authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Anonymous => None,
        }
    }
}

impl From<Option<UserId>> for Caller {
    fn from(user: Option<UserId>) -> Self {
        user.map(Self::User).unwrap_or(Self::Anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_id_is_v7() {
        let id = ItemId::now_v7();
        assert_eq!(id.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_ids_are_sortable() {
        let first = ItemId::now_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ItemId::now_v7();
        assert!(first < second);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = UserId::now_v7();
        let parsed: UserId = parse_id(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_malformed_id() {
        let err = parse_id::<ItemId>("not-an-id").unwrap_err();
        match err {
            ValidationError::MalformedId { field, value } => {
                assert_eq!(field, "item_id");
                assert_eq!(value, "not-an-id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_caller_authentication() {
        assert!(!Caller::Anonymous.is_authenticated());
        let user = UserId::now_v7();
        let caller = Caller::from(Some(user));
        assert!(caller.is_authenticated());
        assert_eq!(caller.user_id(), Some(user));
        assert_eq!(Caller::from(None), Caller::Anonymous);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ItemId::now_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
