//! Fuzz test for search cache keys
//!
//! Any request shape must render a `search:` key without panicking, the
//! rendering must be deterministic, and requests whose normalized forms
//! differ must never share a key.
//!
//! Run with: cargo +nightly fuzz run search_key_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use snipvault_core::{NormalizedQuery, PageLimits, SearchRequest};
use snipvault_storage::{CacheKey, CacheNamespace};

const LIMITS: PageLimits = PageLimits {
    default_page_size: 10,
    max_page_size: 50,
};

fn request(text: &str, page: i64, page_size: i64) -> SearchRequest {
    // Split the input three ways so separators can land in any field.
    let mut parts = text.splitn(3, '\u{1f}');
    let mut request = SearchRequest::new().page(page).page_size(page_size);
    if let Some(keyword) = parts.next() {
        request = request.keyword(keyword);
    }
    if let Some(language) = parts.next() {
        request = request.language(language);
    }
    if let Some(tag) = parts.next() {
        request = request.tag(tag);
    }
    request
}

fuzz_target!(|input: (&str, &str, i64, i64)| {
    let (a, b, page, page_size) = input;

    let query_a = NormalizedQuery::from_request(&request(a, page, page_size), &LIMITS);
    let query_b = NormalizedQuery::from_request(&request(b, page, page_size), &LIMITS);

    let key_a = CacheKey::search(&query_a);
    assert_eq!(key_a.namespace(), CacheNamespace::Search);
    assert!(key_a.as_str().starts_with("search:q="));
    assert_eq!(key_a, CacheKey::search(&query_a));

    let key_b = CacheKey::search(&query_b);
    assert_eq!(query_a == query_b, key_a == key_b, "{} vs {}", key_a, key_b);
});
