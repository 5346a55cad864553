//! Search request, result, and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::{MATCHING_DISTANCE, MATCHING_DISTANCE_MAX, PAGE_LIMIT, PAGE_LIMIT_MAX};
use crate::error::{Error, Result};
use crate::models::{clean_metadata, Bookmark, BookmarkStatus, ContentType};

// =============================================================================
// FILTERS
// =============================================================================

/// Filters on reading state and stars. Several filters combine with OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialFilter {
    /// Read bookmarks of a type that carries a read state
    Read,
    /// Unread bookmarks of a type that carries a read state
    Unread,
    /// Starred bookmarks of any type
    Star,
}

impl SpecialFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Unread => "UNREAD",
            Self::Star => "STAR",
        }
    }

    /// Whether a bookmark satisfies this filter on its own.
    pub fn matches(&self, content_type: Option<ContentType>, read: bool, starred: bool) -> bool {
        let readable = content_type.is_some_and(|t| t.supports_read_state());
        match self {
            Self::Read => readable && read,
            Self::Unread => readable && !read,
            Self::Star => starred,
        }
    }
}

impl std::str::FromStr for SpecialFilter {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "READ" => Ok(Self::Read),
            "UNREAD" => Ok(Self::Unread),
            "STAR" => Ok(Self::Star),
            _ => Err(Error::InvalidInput(format!("Unknown special filter: {}", s))),
        }
    }
}

// =============================================================================
// STRATEGY AND QUERY TYPES
// =============================================================================

/// Retrieval strategy identity.
///
/// Declaration order is the combiner's merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Tag,
    Domain,
    Vector,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Domain => write!(f, "domain"),
            Self::Vector => write!(f, "vector"),
        }
    }
}

/// Escalation tier that produced a vector result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorTier {
    /// Adaptive threshold with the requested matching distance
    Adaptive,
    /// Adaptive threshold with the matching distance widened to 1.0
    Relaxed,
    /// Nearest neighbours by distance, no threshold
    TopK,
}

impl std::fmt::Display for VectorTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::Relaxed => write!(f, "relaxed"),
            Self::TopK => write!(f, "top_k"),
        }
    }
}

/// Shape of a search, used to pick the cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    DefaultBrowse,
    Tag,
    Domain,
    Vector,
    Combined,
}

impl QueryType {
    /// Derive the query type from the strategies that ran.
    pub fn from_strategies(ran: &[StrategyKind]) -> Self {
        let mut kinds = ran.to_vec();
        kinds.sort();
        kinds.dedup();
        match kinds.as_slice() {
            [] => Self::DefaultBrowse,
            [StrategyKind::Tag] => Self::Tag,
            [StrategyKind::Domain] => Self::Domain,
            [StrategyKind::Vector] => Self::Vector,
            _ => Self::Combined,
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultBrowse => write!(f, "default_browse"),
            Self::Tag => write!(f, "tag"),
            Self::Domain => write!(f, "domain"),
            Self::Vector => write!(f, "vector"),
            Self::Combined => write!(f, "combined"),
        }
    }
}

/// How a result was matched, as presented to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Tag,
    Vector,
    Combined,
}

// =============================================================================
// SEARCH RESULT
// =============================================================================

/// One bookmark in a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub preview: Option<String>,
    pub og_image_url: Option<String>,
    pub og_description: Option<String>,
    pub favicon_url: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub status: BookmarkStatus,
    pub score: f64,
    /// None for default browsing, where nothing is matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_count: Option<i64>,
    pub starred: bool,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: JsonValue,
}

impl SearchResult {
    /// Build an unscored result from a bookmark, cleaning its metadata.
    pub fn from_bookmark(bookmark: &Bookmark) -> Self {
        Self {
            id: bookmark.id,
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            summary: bookmark.summary.clone(),
            preview: bookmark.preview.clone(),
            og_image_url: bookmark.og_image_url.clone(),
            og_description: bookmark.og_description.clone(),
            favicon_url: bookmark.favicon_url.clone(),
            content_type: bookmark.content_type,
            status: bookmark.status,
            score: 0.0,
            match_type: None,
            matched_tags: None,
            open_count: None,
            starred: bookmark.starred,
            read: bookmark.read,
            created_at: bookmark.created_at,
            metadata: clean_metadata(bookmark.metadata.clone()),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Inbound search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub user_id: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub types: Option<Vec<ContentType>>,
    #[serde(default)]
    pub special_filters: Option<Vec<SpecialFilter>>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub matching_distance: Option<f64>,
}

impl SearchRequest {
    /// Create a default-browse request for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_types(mut self, types: Vec<ContentType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_special_filters(mut self, filters: Vec<SpecialFilter>) -> Self {
        self.special_filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_matching_distance(mut self, distance: f64) -> Self {
        self.matching_distance = Some(distance);
        self
    }

    /// Trimmed query text; empty when absent.
    pub fn query_text(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or("")
    }

    /// Requested tag names, trimmed, lowercased and deduplicated in order.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for tag in self.tags.iter().flatten() {
            let name = tag.trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Sorted, deduplicated content type filter.
    pub fn type_filter(&self) -> Vec<ContentType> {
        let mut types = self.types.clone().unwrap_or_default();
        types.sort();
        types.dedup();
        types
    }

    /// Sorted, deduplicated special filters.
    pub fn special_filter_set(&self) -> Vec<SpecialFilter> {
        let mut filters = self.special_filters.clone().unwrap_or_default();
        filters.sort();
        filters.dedup();
        filters
    }

    /// Page size, defaulted.
    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(PAGE_LIMIT)
    }

    /// Adaptive matching distance, defaulted.
    pub fn matching_distance_or_default(&self) -> f64 {
        self.matching_distance.unwrap_or(MATCHING_DISTANCE)
    }

    /// Parse the pagination cursor.
    pub fn cursor_id(&self) -> Result<Option<Uuid>> {
        match self.cursor.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| Error::InvalidInput(format!("Malformed cursor: {}", raw))),
        }
    }

    /// Reject malformed input before any storage access.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::InvalidInput("userId is required".to_string()));
        }

        let limit = self.page_size();
        if limit == 0 || limit > PAGE_LIMIT_MAX {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {}",
                PAGE_LIMIT_MAX
            )));
        }

        let distance = self.matching_distance_or_default();
        if !distance.is_finite() || !(0.0..=MATCHING_DISTANCE_MAX).contains(&distance) {
            return Err(Error::InvalidInput(format!(
                "matchingDistance must be between 0 and {}",
                MATCHING_DISTANCE_MAX
            )));
        }

        if let Some(tags) = &self.tags {
            if tags.iter().any(|t| t.trim().is_empty()) {
                return Err(Error::InvalidInput("tag names must not be blank".to_string()));
            }
        }

        self.cursor_id()?;
        Ok(())
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// One page of ranked results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub bookmarks: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self {
            bookmarks: Vec::new(),
            next_cursor: None,
            has_more: false,
            total_count: Some(0),
        }
    }
}

/// Search response returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub bookmarks: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    /// Milliseconds spent computing the page (the original computation on a cache hit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<u64>,
    pub from_cache: bool,
}

impl SearchResponse {
    pub fn from_page(page: SearchPage, query_time_ms: u64, from_cache: bool) -> Self {
        Self {
            bookmarks: page.bookmarks,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
            total_count: page.total_count,
            query_time: Some(query_time_ms),
            from_cache,
        }
    }
}
