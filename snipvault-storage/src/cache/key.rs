//! Cache keys.
//!
//! `CacheKey` has a private inner struct, so the only way to build one is
//! through [`CacheKey::item`] or [`CacheKey::search`]. Search keys are always
//! derived from a [`NormalizedQuery`], which makes equivalent requests share
//! one entry and keeps raw user text out of the key space.

use std::fmt;

use snipvault_core::{ItemId, NormalizedQuery};

/// Namespace a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Anonymous search pages.
    Search,
    /// Single-item lookups.
    Item,
}

impl CacheNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Item => "item",
        }
    }
}

/// A deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    namespace: CacheNamespace,
    rendered: String,
}

impl CacheKey {
    /// Key of a single-item entry: `item:<id>`.
    pub fn item(id: ItemId) -> Self {
        Self {
            inner: CacheKeyInner {
                namespace: CacheNamespace::Item,
                rendered: format!("item:{id}"),
            },
        }
    }

    /// Key of an anonymous search page:
    /// `search:q=<terms>:lang=<language>:tag=<tag>:page=<n>:size=<n>`.
    ///
    /// Terms are already sorted and de-duplicated by normalization; absent
    /// filters render as empty values.
    pub fn search(query: &NormalizedQuery) -> Self {
        let terms = query
            .terms
            .iter()
            .map(|term| escape(term))
            .collect::<Vec<_>>()
            .join(",");
        let language = query.filters.language.as_deref().map(escape).unwrap_or_default();
        let tag = query.filters.tag.as_deref().map(escape).unwrap_or_default();
        Self {
            inner: CacheKeyInner {
                namespace: CacheNamespace::Search,
                rendered: format!(
                    "search:q={terms}:lang={language}:tag={tag}:page={}:size={}",
                    query.page, query.page_size
                ),
            },
        }
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.inner.namespace
    }

    /// The rendered key as stored by a backend.
    pub fn as_str(&self) -> &str {
        &self.inner.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.rendered)
    }
}

/// Percent-escape the characters that delimit key segments.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            ':' => out.push_str("%3A"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}
