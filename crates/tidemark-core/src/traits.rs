//! Traits at the storage, inference, and event seams.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::criteria::{BrowseCriteria, DomainCriteria, TagCriteria, VectorCriteria};
use crate::error::Result;
use crate::search::SearchResult;

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// A vector-search candidate with its blended distance.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub result: SearchResult,
    pub distance: f64,
}

/// Read access to bookmarks for the retrieval strategies.
///
/// Implementations return unscored candidates; scoring belongs to the
/// search pipeline. Candidate metadata must already be cleaned.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Bookmarks owning at least one requested tag. `matched_tags` holds the
    /// intersecting tag names.
    async fn tag_candidates(&self, criteria: &TagCriteria) -> Result<Vec<SearchResult>>;

    /// Bookmarks whose URL contains the canonical domain (case-insensitive).
    async fn domain_candidates(&self, criteria: &DomainCriteria) -> Result<Vec<SearchResult>>;

    /// Bookmarks passing the criteria's vector threshold, nearest first.
    async fn vector_candidates(&self, criteria: &VectorCriteria) -> Result<Vec<VectorHit>>;

    /// Newest-first page for default browsing.
    async fn browse(&self, criteria: &BrowseCriteria) -> Result<Vec<SearchResult>>;
}

/// Historical "open" events per bookmark.
#[async_trait]
pub trait OpenCountSource: Send + Sync {
    /// Open counts for the given bookmarks; ids never opened may be absent.
    async fn open_counts(&self, user_id: &str, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    /// Record one open event.
    async fn record_open(&self, user_id: &str, bookmark_id: Uuid) -> Result<()>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<crate::Vector>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
