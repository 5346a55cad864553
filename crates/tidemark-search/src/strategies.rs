//! Retrieval strategies: tag match, domain match, vector similarity.
//!
//! Each strategy fetches candidates through a [`BookmarkStore`] and assigns a
//! strategy-local score. Nothing here deduplicates across strategies; that
//! is the combiner's job.

use std::time::Instant;

use tracing::{debug, instrument};

use tidemark_core::defaults::{DOMAIN_EXACT_SCORE, DOMAIN_PARTIAL_SCORE};
use tidemark_core::{
    distance_to_score, BookmarkStore, CommonFilter, DomainCriteria, Result, SearchResult,
    TagCriteria, Vector, VectorCriteria, VectorTier,
};

use crate::classifier::extract_domain;

/// Tiers tried in order until one yields candidates.
pub const VECTOR_TIERS: [VectorTier; 3] = [VectorTier::Adaptive, VectorTier::Relaxed, VectorTier::TopK];

/// Score for a tag hit: share of requested tags the bookmark carries, out of 100.
pub fn tag_score(matched: usize, requested: usize) -> f64 {
    if requested == 0 {
        return 0.0;
    }
    (matched.min(requested) as f64 / requested as f64) * 100.0
}

/// Bookmarks owning at least one of `tags` (lowercased names).
#[instrument(skip(store, filter), fields(subsystem = "search", component = "tag_strategy", user_id = %filter.user_id))]
pub async fn tag_search(
    store: &dyn BookmarkStore,
    filter: &CommonFilter,
    tags: &[String],
    limit: usize,
) -> Result<Vec<SearchResult>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let criteria = TagCriteria::new(filter.clone(), tags.to_vec()).with_limit(limit);
    let candidates = store.tag_candidates(&criteria).await?;

    let results: Vec<SearchResult> = candidates
        .into_iter()
        .map(|mut result| {
            let matched = result.matched_tags.as_ref().map_or(0, Vec::len);
            result.score = tag_score(matched, tags.len());
            result
        })
        .collect();

    debug!(
        requested_tags = tags.len(),
        result_count = results.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Tag strategy complete"
    );
    Ok(results)
}

/// Score a candidate URL against the query domain.
///
/// The candidate's own domain must contain the query domain or be contained
/// by it, which admits subdomains and root domains but rejects URLs that
/// only mention the domain in their path.
pub fn domain_match_score(query_domain: &str, candidate_url: &str) -> Option<f64> {
    let candidate = extract_domain(candidate_url)?;
    if candidate == query_domain {
        Some(DOMAIN_EXACT_SCORE)
    } else if candidate.contains(query_domain) || query_domain.contains(candidate.as_str()) {
        Some(DOMAIN_PARTIAL_SCORE)
    } else {
        None
    }
}

/// Bookmarks on `domain` (canonical form), verified against their own URL.
#[instrument(skip(store, filter), fields(subsystem = "search", component = "domain_strategy", user_id = %filter.user_id))]
pub async fn domain_search(
    store: &dyn BookmarkStore,
    filter: &CommonFilter,
    domain: &str,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    let start = Instant::now();
    let criteria = DomainCriteria::new(filter.clone(), domain).with_limit(limit);
    let candidates = store.domain_candidates(&criteria).await?;
    let candidate_count = candidates.len();

    let results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|result| {
            let score = domain_match_score(domain, &result.url)?;
            Some(result.with_score(score))
        })
        .collect();

    debug!(
        candidate_count,
        result_count = results.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Domain strategy complete"
    );
    Ok(results)
}

/// Vector strategy output with the tier that produced it.
#[derive(Debug, Clone)]
pub struct VectorOutcome {
    pub results: Vec<SearchResult>,
    /// Last tier tried; the producing tier when `results` is non-empty.
    pub tier: VectorTier,
}

/// Bookmarks near `embedding`, escalating through the tiers on empty results.
#[instrument(skip(store, filter, embedding), fields(subsystem = "search", component = "vector_strategy", user_id = %filter.user_id))]
pub async fn vector_search(
    store: &dyn BookmarkStore,
    filter: &CommonFilter,
    embedding: &Vector,
    matching_distance: f64,
    top_k: usize,
    limit: usize,
) -> Result<VectorOutcome> {
    let start = Instant::now();
    let mut tier = VectorTier::Adaptive;

    for next in VECTOR_TIERS {
        tier = next;
        let criteria = VectorCriteria::for_tier(
            filter.clone(),
            embedding.clone(),
            tier,
            matching_distance,
            top_k,
        )
        .with_limit(limit);
        let hits = store.vector_candidates(&criteria).await?;

        if !hits.is_empty() {
            let results: Vec<SearchResult> = hits
                .into_iter()
                .map(|hit| hit.result.with_score(distance_to_score(hit.distance)))
                .collect();
            debug!(
                tier = %tier,
                result_count = results.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Vector strategy complete"
            );
            return Ok(VectorOutcome { results, tier });
        }

        debug!(tier = %tier, "Vector tier empty, escalating");
    }

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        "Vector strategy exhausted all tiers"
    );
    Ok(VectorOutcome {
        results: Vec::new(),
        tier,
    })
}
