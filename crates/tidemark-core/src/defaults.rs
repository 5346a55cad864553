//! Centralized default constants for tidemark.
//!
//! **This module is the single source of truth** for shared default values.
//! Scoring weights, cache lifetimes, and pagination sizes live here so the
//! search pipeline, the caches, and the HTTP layer agree on them.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for search requests.
pub const PAGE_LIMIT: usize = 20;

/// Largest page size a caller may request.
pub const PAGE_LIMIT_MAX: usize = 100;

// =============================================================================
// SCORING
// =============================================================================

/// Multiplier applied to tag scores when they enter the combiner.
pub const TAG_SCORE_BOOST: f64 = 1.5;

/// Weight of a vector score when it corroborates an existing hit.
pub const VECTOR_COMBINED_WEIGHT: f64 = 0.6;

/// Domain score when the candidate's domain equals the query domain.
pub const DOMAIN_EXACT_SCORE: f64 = 150.0;

/// Domain score for subdomain/root-domain matches.
pub const DOMAIN_PARTIAL_SCORE: f64 = 120.0;

/// Multiplier on `ln(open_count + 1)` for the frequency boost.
pub const OPEN_FREQUENCY_FACTOR: f64 = 10.0;

// =============================================================================
// VECTOR SEARCH
// =============================================================================

/// Weight of the title embedding in the blended distance.
pub const TITLE_DISTANCE_WEIGHT: f64 = 0.2;

/// Weight of the summary embedding in the blended distance.
pub const SUMMARY_DISTANCE_WEIGHT: f64 = 0.8;

/// Distance assigned to a missing embedding. Also the exclusive sanity
/// bound for the thresholded tiers: a bookmark with no embeddings never
/// passes them.
pub const MISSING_EMBEDDING_DISTANCE: f64 = 1.0;

/// Default adaptive matching distance.
pub const MATCHING_DISTANCE: f64 = 0.1;

/// Matching distance used by the relaxed (second) tier.
pub const RELAXED_MATCHING_DISTANCE: f64 = 1.0;

/// Upper bound accepted for a caller-supplied matching distance.
pub const MATCHING_DISTANCE_MAX: f64 = 2.0;

/// Number of candidates returned by the unthresholded top-K tier.
pub const VECTOR_TOP_K: usize = 30;

/// Cap on candidates fetched per retrieval strategy.
pub const STRATEGY_CANDIDATE_LIMIT: usize = 500;

// =============================================================================
// SEARCH CACHE (TTL in seconds)
// =============================================================================

/// TTL for default browsing pages.
pub const TTL_DEFAULT_BROWSE_SECS: u64 = 1800;

/// TTL for tag-only searches.
pub const TTL_TAG_SECS: u64 = 900;

/// TTL for domain searches.
pub const TTL_DOMAIN_SECS: u64 = 1200;

/// TTL for vector searches.
pub const TTL_VECTOR_SECS: u64 = 600;

/// TTL for searches that ran several strategies.
pub const TTL_COMBINED_SECS: u64 = 450;

/// TTL for any search that found nothing.
pub const TTL_EMPTY_SECS: u64 = 300;

/// Key prefix for search cache entries.
pub const SEARCH_CACHE_PREFIX: &str = "tm:search:";

// =============================================================================
// EMBEDDING CACHE
// =============================================================================

/// TTL for cached query embeddings (7 days).
pub const TTL_EMBEDDING_SECS: u64 = 7 * 24 * 60 * 60;

/// Key prefix for embedding cache entries.
pub const EMBEDDING_CACHE_PREFIX: &str = "tm:embed:";

/// Capacity of the in-process cache store used when Redis is unavailable.
pub const MEMORY_CACHE_CAPACITY: usize = 10_000;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default Redis URL.
pub const REDIS_URL: &str = "redis://localhost:6379";

/// Overall deadline for an uncached search, in seconds.
pub const SEARCH_DEADLINE_SECS: u64 = 10;

// =============================================================================
// CONTENT
// =============================================================================

/// Metadata key carrying raw transcripts; stripped before results leave storage.
pub const TRANSCRIPT_METADATA_KEY: &str = "transcript";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_weights_sum_to_one() {
        assert!((TITLE_DISTANCE_WEIGHT + SUMMARY_DISTANCE_WEIGHT - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_ttl_is_shortest() {
        for ttl in [
            TTL_DEFAULT_BROWSE_SECS,
            TTL_TAG_SECS,
            TTL_DOMAIN_SECS,
            TTL_VECTOR_SECS,
            TTL_COMBINED_SECS,
        ] {
            assert!(TTL_EMPTY_SECS < ttl);
        }
    }

    #[test]
    fn test_page_limits_consistent() {
        assert!(PAGE_LIMIT <= PAGE_LIMIT_MAX);
    }
}
