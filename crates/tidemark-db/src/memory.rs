//! In-memory bookmark store.
//!
//! Implements the same retrieval semantics as the PostgreSQL repositories
//! (filters, tag intersection, domain substring, blended cosine distance,
//! adaptive threshold, browse ordering, open counts) over a map held in
//! process. Used by tests and local development without a database.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use tidemark_core::defaults::MISSING_EMBEDDING_DISTANCE;
use tidemark_core::{
    bookmark_distance, is_exact_domain, Bookmark, BookmarkStore, BrowseCriteria, DomainCriteria,
    Error, OpenCountSource, Result, SearchResult, TagCriteria, VectorCriteria, VectorHit,
    VectorThreshold,
};

/// Bookmarks and open counts held in memory, ordered by id.
#[derive(Default)]
pub struct MemoryBookmarkStore {
    bookmarks: RwLock<BTreeMap<Uuid, Bookmark>>,
    opens: RwLock<HashMap<(String, Uuid), i64>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with bookmarks.
    pub fn with_bookmarks(bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        let map = bookmarks.into_iter().map(|b| (b.id, b)).collect();
        Self {
            bookmarks: RwLock::new(map),
            opens: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a bookmark.
    pub async fn insert(&self, bookmark: Bookmark) {
        self.bookmarks.write().await.insert(bookmark.id, bookmark);
    }

    /// Remove a bookmark and its open events.
    pub async fn remove(&self, id: Uuid) -> Option<Bookmark> {
        let removed = self.bookmarks.write().await.remove(&id);
        if removed.is_some() {
            self.opens.write().await.retain(|(_, bookmark_id), _| *bookmark_id != id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.bookmarks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookmarks.read().await.is_empty()
    }
}

/// Nearest first; equal distances resolve to the newest id.
fn sort_hits(hits: &mut [VectorHit]) {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| b.result.id.cmp(&a.result.id))
    });
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn tag_candidates(&self, criteria: &TagCriteria) -> Result<Vec<SearchResult>> {
        let requested: Vec<String> = criteria.tags.iter().map(|t| t.to_lowercase()).collect();
        let bookmarks = self.bookmarks.read().await;

        let mut results: Vec<SearchResult> = bookmarks
            .values()
            .rev()
            .filter(|b| criteria.filter.admits(b))
            .filter_map(|b| {
                let mut matched: Vec<String> = b
                    .tags
                    .iter()
                    .map(|t| t.name.to_lowercase())
                    .filter(|name| requested.contains(name))
                    .collect();
                matched.sort();
                matched.dedup();
                if matched.is_empty() {
                    return None;
                }
                let mut result = SearchResult::from_bookmark(b);
                result.matched_tags = Some(matched);
                Some(result)
            })
            .collect();

        // Most matched tags first, so the limit drops the weakest hits.
        // The sort is stable over the newest-first iteration.
        results.sort_by_key(|r| Reverse(r.matched_tags.as_ref().map_or(0, Vec::len)));
        results.truncate(criteria.limit);
        Ok(results)
    }

    async fn domain_candidates(&self, criteria: &DomainCriteria) -> Result<Vec<SearchResult>> {
        let domain = criteria.domain.to_lowercase();
        let bookmarks = self.bookmarks.read().await;

        let mut matches: Vec<&Bookmark> = bookmarks
            .values()
            .rev()
            .filter(|b| criteria.filter.admits(b) && b.url.to_lowercase().contains(&domain))
            .collect();

        // Exact host matches ahead of partial ones, newest first within each.
        matches.sort_by_key(|b| !is_exact_domain(&domain, &b.url));
        Ok(matches
            .into_iter()
            .take(criteria.limit)
            .map(SearchResult::from_bookmark)
            .collect())
    }

    async fn vector_candidates(&self, criteria: &VectorCriteria) -> Result<Vec<VectorHit>> {
        let bookmarks = self.bookmarks.read().await;
        let distance = |b: &Bookmark| {
            bookmark_distance(
                &criteria.embedding,
                b.title_embedding.as_ref(),
                b.summary_embedding.as_ref(),
            )
        };

        let mut hits: Vec<VectorHit> = match criteria.threshold {
            VectorThreshold::Adaptive { matching_distance } => {
                let eligible: Vec<(&Bookmark, f64)> = bookmarks
                    .values()
                    .filter(|b| criteria.filter.admits_owner_and_status(b))
                    .map(|b| (b, distance(b)))
                    .collect();

                let Some(min_distance) = eligible.iter().map(|(_, d)| *d).reduce(f64::min) else {
                    return Ok(Vec::new());
                };

                eligible
                    .into_iter()
                    .filter(|(b, d)| {
                        criteria.filter.admits_content(b)
                            && *d <= min_distance + matching_distance
                            && *d < MISSING_EMBEDDING_DISTANCE
                    })
                    .map(|(b, d)| VectorHit {
                        result: SearchResult::from_bookmark(b),
                        distance: d,
                    })
                    .collect()
            }
            VectorThreshold::TopK { .. } => bookmarks
                .values()
                .filter(|b| criteria.filter.admits(b))
                .map(|b| VectorHit {
                    result: SearchResult::from_bookmark(b),
                    distance: distance(b),
                })
                .collect(),
        };

        sort_hits(&mut hits);
        let limit = match criteria.threshold {
            VectorThreshold::TopK { k } => k.min(criteria.limit),
            VectorThreshold::Adaptive { .. } => criteria.limit,
        };
        hits.truncate(limit);
        Ok(hits)
    }

    async fn browse(&self, criteria: &BrowseCriteria) -> Result<Vec<SearchResult>> {
        let bookmarks = self.bookmarks.read().await;

        let results = bookmarks
            .values()
            .rev()
            .filter(|b| criteria.before.map_or(true, |before| b.id < before))
            .filter(|b| criteria.filter.admits(b))
            .take(criteria.limit)
            .map(SearchResult::from_bookmark)
            .collect();

        Ok(results)
    }
}

#[async_trait]
impl OpenCountSource for MemoryBookmarkStore {
    async fn open_counts(&self, user_id: &str, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let opens = self.opens.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                opens
                    .get(&(user_id.to_string(), *id))
                    .map(|count| (*id, *count))
            })
            .collect())
    }

    async fn record_open(&self, user_id: &str, bookmark_id: Uuid) -> Result<()> {
        let owned = self
            .bookmarks
            .read()
            .await
            .get(&bookmark_id)
            .is_some_and(|b| b.user_id == user_id);
        if !owned {
            return Err(Error::NotFound(format!("Bookmark {} not found", bookmark_id)));
        }

        *self
            .opens
            .write()
            .await
            .entry((user_id.to_string(), bookmark_id))
            .or_insert(0) += 1;
        Ok(())
    }
}
