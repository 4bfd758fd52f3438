//! Catalog Configuration Module
//!
//! TTLs, page bounds, backend deadlines and invalidation retry policy.
//! Values are injected by the embedding service; `from_env` reads them from
//! environment variables with development defaults.

use std::time::Duration;

use snipvault_core::{CatalogError, CatalogResult, ConfigError, FieldWeights, PageLimits};

/// Longest TTL a cache entry may be given.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest deadline or backoff the service will wait on.
pub const MAX_WAIT: Duration = Duration::from_secs(10 * 60);

/// Configuration for the search-and-rating core.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// TTL of anonymous search pages.
    pub search_ttl: Duration,
    /// TTL of single-item entries.
    pub item_ttl: Duration,
    /// Page size used when the caller gives none.
    pub default_page_size: u32,
    /// Page size of a favorites listing when the caller gives none.
    pub favorites_page_size: u32,
    /// Upper bound for any page size.
    pub max_page_size: u32,
    /// Deadline for each individual store, index or cache call.
    pub backend_timeout: Duration,
    /// Extra attempts after a failed `item:<id>` invalidation.
    pub invalidation_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub invalidation_backoff: Duration,
    /// Relevance weights.
    pub field_weights: FieldWeights,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(90),
            item_ttl: Duration::from_secs(300),
            default_page_size: 10,
            favorites_page_size: 20,
            max_page_size: 50,
            backend_timeout: Duration::from_secs(5),
            invalidation_retries: 3,
            invalidation_backoff: Duration::from_millis(50),
            field_weights: FieldWeights::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_ttl(mut self, ttl: Duration) -> Self {
        self.search_ttl = ttl;
        self
    }

    pub fn with_item_ttl(mut self, ttl: Duration) -> Self {
        self.item_ttl = ttl;
        self
    }

    pub fn with_page_sizes(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_favorites_page_size(mut self, page_size: u32) -> Self {
        self.favorites_page_size = page_size;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_invalidation_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.invalidation_retries = retries;
        self.invalidation_backoff = backoff;
        self
    }

    pub fn with_field_weights(mut self, weights: FieldWeights) -> Self {
        self.field_weights = weights;
        self
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }

    /// Limits for favorites listings: same ceiling, own default.
    pub fn favorites_page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.favorites_page_size,
            max_page_size: self.max_page_size,
        }
    }

    /// Check every invariant the service relies on.
    pub fn validate(&self) -> CatalogResult<()> {
        check_bounded("search_ttl", self.search_ttl, MAX_CACHE_TTL)?;
        check_bounded("item_ttl", self.item_ttl, MAX_CACHE_TTL)?;
        if self.max_page_size == 0 {
            return Err(invalid("max_page_size", "0", "max_page_size must be at least 1"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(invalid(
                "default_page_size",
                &self.default_page_size.to_string(),
                "default_page_size must be between 1 and max_page_size",
            ));
        }
        if self.favorites_page_size == 0 || self.favorites_page_size > self.max_page_size {
            return Err(invalid(
                "favorites_page_size",
                &self.favorites_page_size.to_string(),
                "favorites_page_size must be between 1 and max_page_size",
            ));
        }
        check_bounded("backend_timeout", self.backend_timeout, MAX_WAIT)?;
        if self.invalidation_backoff > MAX_WAIT {
            return Err(invalid(
                "invalidation_backoff",
                &format!("{:?}", self.invalidation_backoff),
                "invalidation_backoff must not exceed 10 minutes",
            ));
        }
        self.field_weights.validate()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SNIPVAULT_CACHE_TTL_SEARCH`: search page TTL in seconds (default: 90)
    /// - `SNIPVAULT_CACHE_TTL_ITEM`: item TTL in seconds (default: 300)
    /// - `SNIPVAULT_MAX_PAGE_SIZE`: maximum page size (default: 50)
    /// - `SNIPVAULT_DEFAULT_PAGE_SIZE`: page size when none given (default: 10)
    /// - `SNIPVAULT_FAVORITES_PAGE_SIZE`: favorites page size when none given (default: 20)
    /// - `SNIPVAULT_BACKEND_TIMEOUT_MS`: per-call deadline (default: 5000)
    /// - `SNIPVAULT_INVALIDATION_RETRIES`: invalidation retries (default: 3)
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are
    /// rejected rather than silently ignored.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let search_ttl = parse_var(&lookup, "SNIPVAULT_CACHE_TTL_SEARCH")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.search_ttl);
        let item_ttl = parse_var(&lookup, "SNIPVAULT_CACHE_TTL_ITEM")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.item_ttl);
        let max_page_size =
            parse_var(&lookup, "SNIPVAULT_MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size);
        let default_page_size = parse_var(&lookup, "SNIPVAULT_DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.default_page_size);
        let favorites_page_size = parse_var(&lookup, "SNIPVAULT_FAVORITES_PAGE_SIZE")?
            .unwrap_or(defaults.favorites_page_size);
        let backend_timeout = parse_var(&lookup, "SNIPVAULT_BACKEND_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.backend_timeout);
        let invalidation_retries = parse_var(&lookup, "SNIPVAULT_INVALIDATION_RETRIES")?
            .unwrap_or(defaults.invalidation_retries);

        let config = Self {
            search_ttl,
            item_ttl,
            default_page_size,
            favorites_page_size,
            max_page_size,
            backend_timeout,
            invalidation_retries,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> CatalogResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(name, &raw, "expected a non-negative integer")),
    }
}

/// Reject zero and anything above `max`.
fn check_bounded(field: &str, value: Duration, max: Duration) -> CatalogResult<()> {
    if value.is_zero() || value > max {
        return Err(invalid(
            field,
            &format!("{value:?}"),
            &format!("{field} must be positive and at most {max:?}"),
        ));
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> CatalogError {
    CatalogError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.search_ttl, Duration::from_secs(90));
        assert_eq!(config.item_ttl, Duration::from_secs(300));
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("SNIPVAULT_CACHE_TTL_SEARCH", "30"),
            ("SNIPVAULT_CACHE_TTL_ITEM", "60"),
            ("SNIPVAULT_MAX_PAGE_SIZE", "20"),
            ("SNIPVAULT_DEFAULT_PAGE_SIZE", "5"),
            ("SNIPVAULT_BACKEND_TIMEOUT_MS", "250"),
            ("SNIPVAULT_INVALIDATION_RETRIES", "1"),
        ]))
        .unwrap();
        assert_eq!(config.search_ttl, Duration::from_secs(30));
        assert_eq!(config.item_ttl, Duration::from_secs(60));
        assert_eq!(config.max_page_size, 20);
        assert_eq!(config.default_page_size, 5);
        assert_eq!(config.backend_timeout, Duration::from_millis(250));
        assert_eq!(config.invalidation_retries, 1);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err =
            CatalogConfig::from_lookup(lookup(&[("SNIPVAULT_MAX_PAGE_SIZE", "lots")])).unwrap_err();
        match err {
            CatalogError::Config(ConfigError::InvalidValue { field, value, .. }) => {
                assert_eq!(field, "SNIPVAULT_MAX_PAGE_SIZE");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_page_sizes() {
        let config = CatalogConfig::new().with_page_sizes(60, 50);
        assert!(config.validate().is_err());
        let config = CatalogConfig::new().with_page_sizes(1, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = CatalogConfig::new().with_item_ttl(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_rejects_oversized_ttl() {
        let huge = u64::MAX.to_string();
        for name in ["SNIPVAULT_CACHE_TTL_SEARCH", "SNIPVAULT_CACHE_TTL_ITEM"] {
            let err = CatalogConfig::from_lookup(lookup(&[(name, huge.as_str())])).unwrap_err();
            assert!(matches!(err, CatalogError::Config(_)), "{name} accepted");
        }
        let week = MAX_CACHE_TTL.as_secs().to_string();
        assert!(
            CatalogConfig::from_lookup(lookup(&[("SNIPVAULT_CACHE_TTL_SEARCH", week.as_str())]))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_caps_waits() {
        let config = CatalogConfig::new().with_backend_timeout(Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());
        let config =
            CatalogConfig::new().with_invalidation_retry(3, Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_favorites_page_size() {
        assert_eq!(CatalogConfig::default().favorites_page_limits().default_page_size, 20);
        let config = CatalogConfig::from_lookup(lookup(&[("SNIPVAULT_FAVORITES_PAGE_SIZE", "7")]))
            .unwrap();
        assert_eq!(config.favorites_page_size, 7);
        assert!(CatalogConfig::new().with_favorites_page_size(51).validate().is_err());
    }

    #[test]
    fn test_page_limits() {
        let limits = CatalogConfig::new().with_page_sizes(5, 20).page_limits();
        assert_eq!(limits.default_page_size, 5);
        assert_eq!(limits.max_page_size, 20);
    }
}
