//! Weighted multi-field full-text index.
//!
//! Relevance is `Σ weight(field) × term_frequency(term, field)` over every
//! query term and indexed field. An item matches when any query term occurs
//! in any field. Filters (language, tag) restrict both searches and scans.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use snipvault_core::{
    tokenize, CatalogResult, FieldWeights, Item, ItemId, PageWindow, SearchFilters,
};
use tokio::sync::RwLock;

/// One relevance hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredHit {
    pub item_id: ItemId,
    pub score: u32,
}

/// Search index contract.
///
/// `search` and `count` must apply exactly the same match rule and filters,
/// so `count` is the total of the unpaginated `search` result.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Make an item searchable.
    async fn index_item(&self, item: &Item) -> CatalogResult<()>;

    /// Relevance search. Ordered by score descending, then id ascending.
    /// An empty term list matches nothing.
    async fn search(
        &self,
        terms: &[String],
        filters: &SearchFilters,
        window: PageWindow,
    ) -> CatalogResult<Vec<ScoredHit>>;

    /// Keyword-less filtered scan, most rated first: `rating_count` desc,
    /// then `created_at` desc, then id asc.
    async fn scan(&self, filters: &SearchFilters, window: PageWindow)
        -> CatalogResult<Vec<ItemId>>;

    /// Number of items matching the terms and filters. An empty term list
    /// counts every item that passes the filters.
    async fn count(&self, terms: &[String], filters: &SearchFilters) -> CatalogResult<u64>;
}

/// Term frequencies of one term within one item, per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FieldHits {
    title: u32,
    tags: u32,
    description: u32,
    body: u32,
}

impl FieldHits {
    fn score(&self, weights: &FieldWeights) -> u32 {
        self.title * weights.title
            + self.tags * weights.tags
            + self.description * weights.description
            + self.body * weights.body
    }
}

type Postings = HashMap<String, HashMap<ItemId, FieldHits>>;

/// In-memory inverted index.
///
/// Documents are read from the store's item map, so filters and popularity
/// ordering always see the current aggregate; only the postings are owned
/// here.
#[derive(Debug, Clone)]
pub struct MemorySearchIndex {
    documents: Arc<DashMap<ItemId, Item>>,
    postings: Arc<RwLock<Postings>>,
    weights: FieldWeights,
}

impl MemorySearchIndex {
    /// Index over a shared item map with default weights.
    pub fn over(documents: Arc<DashMap<ItemId, Item>>) -> Self {
        Self::with_weights(documents, FieldWeights::default())
    }

    /// Index over a shared item map with custom weights.
    pub fn with_weights(documents: Arc<DashMap<ItemId, Item>>, weights: FieldWeights) -> Self {
        Self {
            documents,
            postings: Arc::new(RwLock::new(HashMap::new())),
            weights,
        }
    }

    fn passes(&self, id: &ItemId, filters: &SearchFilters) -> bool {
        self.documents
            .get(id)
            .map(|item| matches_filters(item.value(), filters))
            .unwrap_or(false)
    }

    async fn ranked(&self, terms: &[String], filters: &SearchFilters) -> Vec<ScoredHit> {
        let postings = self.postings.read().await;
        let mut scores: HashMap<ItemId, u32> = HashMap::new();
        for term in terms {
            let Some(docs) = postings.get(term) else {
                continue;
            };
            for (item_id, hits) in docs {
                *scores.entry(*item_id).or_default() += hits.score(&self.weights);
            }
        }
        drop(postings);

        let mut hits: Vec<ScoredHit> = scores
            .into_iter()
            .filter(|(item_id, _)| self.passes(item_id, filters))
            .map(|(item_id, score)| ScoredHit { item_id, score })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.item_id.cmp(&b.item_id)));
        hits
    }

    fn filtered(&self, filters: &SearchFilters) -> Vec<Item> {
        self.documents
            .iter()
            .filter(|entry| matches_filters(entry.value(), filters))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

fn matches_filters(item: &Item, filters: &SearchFilters) -> bool {
    let language_ok = filters
        .language
        .as_deref()
        .map_or(true, |language| item.has_language(language));
    let tag_ok = filters.tag.as_deref().map_or(true, |tag| item.has_tag(tag));
    language_ok && tag_ok
}

fn popularity(a: &Item, b: &Item) -> Ordering {
    b.rating_count
        .cmp(&a.rating_count)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Per-term field frequencies for one item.
fn field_hits(item: &Item) -> HashMap<String, FieldHits> {
    let mut hits: HashMap<String, FieldHits> = HashMap::new();
    for term in tokenize(&item.title) {
        hits.entry(term).or_default().title += 1;
    }
    for tag in &item.tags {
        for term in tokenize(tag) {
            hits.entry(term).or_default().tags += 1;
        }
    }
    for term in tokenize(&item.description) {
        hits.entry(term).or_default().description += 1;
    }
    for term in tokenize(&item.body) {
        hits.entry(term).or_default().body += 1;
    }
    hits
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_item(&self, item: &Item) -> CatalogResult<()> {
        let hits = field_hits(item);
        let mut postings = self.postings.write().await;
        for docs in postings.values_mut() {
            docs.remove(&item.item_id);
        }
        for (term, field_hits) in hits {
            postings.entry(term).or_default().insert(item.item_id, field_hits);
        }
        postings.retain(|_, docs| !docs.is_empty());
        Ok(())
    }

    async fn search(
        &self,
        terms: &[String],
        filters: &SearchFilters,
        window: PageWindow,
    ) -> CatalogResult<Vec<ScoredHit>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        Ok(window.slice(self.ranked(terms, filters).await))
    }

    async fn scan(
        &self,
        filters: &SearchFilters,
        window: PageWindow,
    ) -> CatalogResult<Vec<ItemId>> {
        let mut items = self.filtered(filters);
        items.sort_by(popularity);
        Ok(window.slice(items.into_iter().map(|item| item.item_id)))
    }

    async fn count(&self, terms: &[String], filters: &SearchFilters) -> CatalogResult<u64> {
        if terms.is_empty() {
            return Ok(self
                .documents
                .iter()
                .filter(|entry| matches_filters(entry.value(), filters))
                .count() as u64);
        }
        Ok(self.ranked(terms, filters).await.len() as u64)
    }
}
