//! Search request shapes, normalization and result pages.

use serde::{Deserialize, Serialize};

use crate::tokenizer::normalize_keyword;

/// Raw search parameters as received from the transport layer.
///
/// Nothing here is trusted: page numbers may be negative, page sizes may be
/// huge and text may carry arbitrary case and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Bounds applied to every paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl PageLimits {
    /// Clamp raw page parameters.
    ///
    /// Pages below 1 become 1; a missing page size takes the default and any
    /// page size is clamped into `1..=max_page_size`.
    pub fn clamp(&self, page: Option<i64>, page_size: Option<i64>) -> (u32, u32) {
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let max = self.max_page_size.max(1) as i64;
        let page_size = page_size
            .unwrap_or(self.default_page_size as i64)
            .clamp(1, max) as u32;
        (page, page_size)
    }
}

/// Structured filters shared by relevance search, scans and counts.
///
/// Values are trimmed and lowercased; blank values mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub language: Option<String>,
    pub tag: Option<String>,
}

impl SearchFilters {
    pub fn new(language: Option<&str>, tag: Option<&str>) -> Self {
        Self {
            language: normalize_filter(language),
            tag: normalize_filter(tag),
        }
    }
}

fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// A contiguous slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            offset: (page.saturating_sub(1) as usize).saturating_mul(page_size as usize),
            limit: page_size as usize,
        }
    }

    /// Apply this window to an already ordered sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

/// A search request after normalization.
///
/// Two requests that normalize to the same value must produce the same
/// page, so this is also what cache keys are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedQuery {
    /// Canonical keyword terms. Empty means keyword-less.
    pub terms: Vec<String>,
    pub filters: SearchFilters,
    pub page: u32,
    pub page_size: u32,
}

impl NormalizedQuery {
    pub fn from_request(request: &SearchRequest, limits: &PageLimits) -> Self {
        let terms = request
            .keyword
            .as_deref()
            .map(normalize_keyword)
            .unwrap_or_default();
        let (page, page_size) = limits.clamp(request.page, request.page_size);
        Self {
            terms,
            filters: SearchFilters::new(request.language.as_deref(), request.tag.as_deref()),
            page,
            page_size,
        }
    }

    /// Whether relevance search applies.
    pub fn has_keyword(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.page_size)
    }
}

/// One page of results with self-consistent pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    /// Number of results matching the same filter as `items`.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<T>,
}

impl<T> SearchPage<T> {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            total: 0,
            page,
            page_size,
            items: Vec::new(),
        }
    }

    pub fn map<U, F>(self, f: F) -> SearchPage<U>
    where
        F: FnMut(T) -> U,
    {
        SearchPage {
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: PageLimits = PageLimits {
        default_page_size: 10,
        max_page_size: 50,
    };

    #[test]
    fn test_clamp_defaults() {
        assert_eq!(LIMITS.clamp(None, None), (1, 10));
    }

    #[test]
    fn test_clamp_out_of_range_values() {
        assert_eq!(LIMITS.clamp(Some(0), Some(0)), (1, 1));
        assert_eq!(LIMITS.clamp(Some(-4), Some(-1)), (1, 1));
        assert_eq!(LIMITS.clamp(Some(3), Some(500)), (3, 50));
    }

    #[test]
    fn test_window_offsets() {
        let window = PageWindow::new(3, 10);
        assert_eq!(window.offset, 20);
        assert_eq!(window.limit, 10);
        assert_eq!(window.slice(0..25), (20..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_blank_keyword_is_keywordless() {
        let request = SearchRequest::new().keyword("   ");
        let query = NormalizedQuery::from_request(&request, &LIMITS);
        assert!(!query.has_keyword());
    }

    #[test]
    fn test_equivalent_requests_normalize_equal() {
        let a = SearchRequest::new()
            .keyword("Binary Search")
            .language(" Rust ")
            .tag("ALGO")
            .page(0)
            .page_size(10);
        let b = SearchRequest::new()
            .keyword("search binary")
            .language("rust")
            .tag("algo")
            .page(1);
        assert_eq!(
            NormalizedQuery::from_request(&a, &LIMITS),
            NormalizedQuery::from_request(&b, &LIMITS)
        );
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let filters = SearchFilters::new(Some("  "), None);
        assert_eq!(filters, SearchFilters::default());
    }

    #[test]
    fn test_page_map_preserves_metadata() {
        let page = SearchPage {
            total: 12,
            page: 2,
            page_size: 5,
            items: vec![1, 2, 3],
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.total, 12);
        assert_eq!(mapped.items, vec![10, 20, 30]);
    }
}
