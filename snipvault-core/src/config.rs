//! Configuration types

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult, ConfigError};

/// Per-field weights for relevance scoring.
///
/// A term hit in a field contributes `weight * term_frequency` to the score.
/// The weights must be strictly ordered title > tags > description > body > 0
/// so that a title hit always ranks above the same hit in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub title: u32,
    pub tags: u32,
    pub description: u32,
    pub body: u32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 5,
            tags: 3,
            description: 2,
            body: 1,
        }
    }
}

impl FieldWeights {
    /// Validate the ordering constraint.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.body == 0 {
            return Err(invalid("field_weights.body", self.body, "must be greater than 0"));
        }
        if self.description <= self.body {
            return Err(invalid(
                "field_weights.description",
                self.description,
                "must be greater than the body weight",
            ));
        }
        if self.tags <= self.description {
            return Err(invalid(
                "field_weights.tags",
                self.tags,
                "must be greater than the description weight",
            ));
        }
        if self.title <= self.tags {
            return Err(invalid(
                "field_weights.title",
                self.title,
                "must be greater than the tags weight",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: u32, reason: &str) -> CatalogError {
    CatalogError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}
