//! Structured logging schema and field name constants for tidemark.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query the same field across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), completed searches |
//! | DEBUG | Decision points (classification, tier escalation, cache hit/miss) |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference", "cache"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "engine", "tag_strategy", "search_cache", "ollama", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owner of the bookmarks being searched.
pub const USER_ID: &str = "user_id";

/// Bookmark UUID being operated on.
pub const BOOKMARK_ID: &str = "bookmark_id";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Classified query type ("default_browse", "tag", "domain", "vector", "combined").
pub const QUERY_TYPE: &str = "query_type";

/// Retrieval strategy ("tag", "domain", "vector").
pub const STRATEGY: &str = "strategy";

/// Vector escalation tier ("adaptive", "relaxed", "top_k").
pub const TIER: &str = "tier";

/// Matching distance used by the vector strategy.
pub const MATCHING_DISTANCE: &str = "matching_distance";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Cache fields ──────────────────────────────────────────────────────────

/// Cache key touched by the operation.
pub const CACHE_KEY: &str = "cache_key";

/// TTL written with a cache entry.
pub const TTL_SECS: &str = "ttl_secs";

/// Cache backend ("redis", "memory").
pub const CACHE_BACKEND: &str = "cache_backend";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
