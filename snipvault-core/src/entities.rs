//! Catalogue entities: items, ratings, favorites and the rating aggregate.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{ItemId, Timestamp, UserId};

/// Entity type discriminator used in not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Rating,
}

// ============================================================================
// RATING VALUE
// ============================================================================

/// A validated rating in the closed range 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a raw value supplied by the caller.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange { value })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

// ============================================================================
// ITEM
// ============================================================================

/// A catalogued code snippet.
///
/// `avg_rating` and `rating_count` are derived from the item's Rating
/// records and are only ever written by the rating path.
/// `aggregate_revision` is the rating revision the stored aggregate was
/// computed from; an aggregate computed from an older revision is never
/// allowed to overwrite a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub title: String,
    pub description: String,
    pub language: String,
    /// Display order is preserved; matching ignores order.
    pub tags: Vec<String>,
    pub body: String,
    pub avg_rating: f64,
    pub rating_count: u64,
    #[serde(default)]
    pub aggregate_revision: u64,
    pub created_at: Timestamp,
}

impl Item {
    /// Build a fresh item with an empty aggregate.
    pub fn from_new(new_item: NewItem, created_at: Timestamp) -> Self {
        Self {
            item_id: ItemId::now_v7(),
            title: new_item.title,
            description: new_item.description,
            language: new_item.language,
            tags: new_item.tags,
            body: new_item.body,
            avg_rating: 0.0,
            rating_count: 0,
            aggregate_revision: 0,
            created_at,
        }
    }

    /// Whether the item carries the given language tag (case-insensitive).
    pub fn has_language(&self, language: &str) -> bool {
        self.language.to_lowercase() == language.to_lowercase()
    }

    /// Whether the item carries the given free-text tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = fold_tag(tag);
        self.tags.iter().any(|t| fold_tag(t) == tag)
    }

    /// Copy a recomputed aggregate onto the derived fields.
    pub fn apply_aggregate(&mut self, aggregate: &RatingAggregate) {
        self.avg_rating = aggregate.mean;
        self.rating_count = aggregate.count;
        self.aggregate_revision = aggregate.revision;
    }
}

/// Ingestion payload for a new item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub body: String,
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Validate and tidy the payload.
    ///
    /// The title is required. Surrounding whitespace is trimmed from every
    /// text field and blank or repeated tags are dropped, keeping the first
    /// occurrence so display order survives.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "title".to_string(),
            });
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            let folded = fold_tag(tag);
            if tag.is_empty() || seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            tags.push(tag.to_string());
        }

        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            language: self.language.trim().to_string(),
            tags,
            body: self.body,
        })
    }
}

/// Case folding shared by tag dedup and tag filters, so two tags that the
/// filter treats as equal never both survive ingestion.
fn fold_tag(tag: &str) -> String {
    tag.to_lowercase()
}

// ============================================================================
// RATING / FAVORITE
// ============================================================================

/// One user's vote on one item. Unique per (user_id, item_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub value: RatingValue,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: ItemId, value: RatingValue) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            item_id,
            value,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A bookmark. Unique per (user_id, item_id), independent of ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub created_at: Timestamp,
}

impl Favorite {
    pub fn new(user_id: UserId, item_id: ItemId) -> Self {
        Self {
            user_id,
            item_id,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Mean and count over every Rating of one item, stamped with the rating
/// revision it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub mean: f64,
    pub count: u64,
    pub revision: u64,
}

impl RatingAggregate {
    /// Compute the aggregate from the complete set of values.
    pub fn from_values<I>(values: I, revision: u64) -> Self
    where
        I: IntoIterator<Item = RatingValue>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), v| (sum + v.get() as u64, count + 1));
        let mean = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };
        Self {
            mean,
            count,
            revision,
        }
    }

    /// Whether this aggregate may replace one computed at `revision`.
    pub fn supersedes(&self, revision: u64) -> bool {
        self.revision >= revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_value_bounds() {
        assert!(RatingValue::new(0).is_err());
        assert!(RatingValue::new(6).is_err());
        assert!(RatingValue::new(-3).is_err());
        for v in 1..=5 {
            assert_eq!(RatingValue::new(v).unwrap().get() as i64, v);
        }
    }

    #[test]
    fn test_rating_value_deserialize_validates() {
        let ok: RatingValue = serde_json::from_str("4").unwrap();
        assert_eq!(ok.get(), 4);
        assert!(serde_json::from_str::<RatingValue>("9").is_err());
    }

    #[test]
    fn test_aggregate_mean_and_count() {
        let values = [3, 4, 5].map(|v| RatingValue::new(v).unwrap());
        let agg = RatingAggregate::from_values(values, 3);
        assert_eq!(agg.count, 3);
        assert!((agg.mean - 4.0).abs() < f64::EPSILON);
        assert_eq!(agg.revision, 3);
    }

    #[test]
    fn test_empty_aggregate_is_zero() {
        let agg = RatingAggregate::from_values(std::iter::empty(), 0);
        assert_eq!(agg.count, 0);
        assert_eq!(agg.mean, 0.0);
    }

    #[test]
    fn test_aggregate_supersedes_same_or_older_revision() {
        let agg = RatingAggregate {
            mean: 4.5,
            count: 2,
            revision: 7,
        };
        assert!(agg.supersedes(7));
        assert!(agg.supersedes(3));
        assert!(!agg.supersedes(8));
    }

    #[test]
    fn test_new_item_normalization() {
        let item = NewItem::new("  Quick sort  ")
            .with_language(" python ")
            .with_tags(["algo", " ", "Algo", "sorting "])
            .normalized()
            .unwrap();
        assert_eq!(item.title, "Quick sort");
        assert_eq!(item.language, "python");
        assert_eq!(item.tags, vec!["algo".to_string(), "sorting".to_string()]);
    }

    #[test]
    fn test_tag_dedup_folds_like_the_filter() {
        let item = NewItem::new("t")
            .with_tags(["Ärger", "ärger", "ÉTÉ", "été"])
            .normalized()
            .unwrap();
        assert_eq!(item.tags, vec!["Ärger".to_string(), "ÉTÉ".to_string()]);

        let item = Item::from_new(item, Utc::now());
        assert!(item.has_tag("ärger"));
        assert!(item.has_tag("Été"));
    }

    #[test]
    fn test_new_item_requires_title() {
        let err = NewItem::new("   ").normalized().unwrap_err();
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                field: "title".to_string()
            }
        );
    }

    #[test]
    fn test_item_filters_are_case_insensitive() {
        let item = Item::from_new(
            NewItem::new("t").with_language("Python").with_tags(["CLI"]),
            Utc::now(),
        );
        assert!(item.has_language("python"));
        assert!(item.has_tag("cli"));
        assert!(!item.has_tag("db"));
    }
}
