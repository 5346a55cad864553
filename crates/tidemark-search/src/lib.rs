//! # tidemark-search
//!
//! Bookmark search and ranking for tidemark.
//!
//! This crate provides:
//! - Query classification (default browse, domain, general search)
//! - Tag, domain and vector retrieval strategies, with tiered vector fallback
//! - A fixed-order result combiner and open-frequency boost
//! - Stable ranking and cursor pagination
//! - [`BookmarkSearchEngine`], which ties these together behind the caches
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tidemark_search::{BookmarkSearchEngine, SearchRequest};
//!
//! let engine = BookmarkSearchEngine::new(store, opens, embedder, cache_store);
//! let response = engine
//!     .search(&SearchRequest::new("user-1").with_query("rust async"))
//!     .await?;
//! for bookmark in response.bookmarks {
//!     println!("{:.1} {}", bookmark.score, bookmark.url);
//! }
//! ```

pub mod boost;
pub mod classifier;
pub mod combiner;
pub mod engine;
pub mod ranking;
pub mod strategies;

// Re-export core types
pub use tidemark_core::*;

pub use boost::{apply_open_frequency_boost, boost_results};
pub use classifier::{classify, extract_domain, is_domain_query, QueryClass};
pub use combiner::{combine_results, StrategyResults};
pub use engine::{BookmarkSearchEngine, SearchEngineConfig};
pub use ranking::{compare_results, paginate, sort_search_results};
pub use strategies::{
    domain_match_score, domain_search, tag_score, tag_search, vector_search, VectorOutcome,
    VECTOR_TIERS,
};
