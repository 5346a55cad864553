//! Bookmark data model as written by the ingestion pipeline.
//!
//! The search core only reads these records; creation and processing are
//! owned by other services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::TRANSCRIPT_METADATA_KEY;
use crate::error::Error;

/// Embedding vector type (re-exported from pgvector).
pub use pgvector::Vector;

// =============================================================================
// STATUS AND CONTENT TYPE
// =============================================================================

/// Processing status of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookmarkStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl BookmarkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for BookmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookmarkStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "READY" => Ok(Self::Ready),
            "ERROR" => Ok(Self::Error),
            _ => Err(Error::InvalidInput(format!("Unknown bookmark status: {}", s))),
        }
    }
}

/// Content type assigned to a bookmark by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Article,
    Page,
    Image,
    Video,
    Tweet,
    Pdf,
    Product,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 7] = [
        Self::Article,
        Self::Page,
        Self::Image,
        Self::Video,
        Self::Tweet,
        Self::Pdf,
        Self::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "ARTICLE",
            Self::Page => "PAGE",
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
            Self::Tweet => "TWEET",
            Self::Pdf => "PDF",
            Self::Product => "PRODUCT",
        }
    }

    /// Whether bookmarks of this type carry a meaningful read/unread state.
    pub fn supports_read_state(&self) -> bool {
        matches!(self, Self::Article | Self::Video)
    }

    /// Content types that carry a read state.
    pub fn readable() -> Vec<ContentType> {
        Self::ALL
            .into_iter()
            .filter(ContentType::supports_read_state)
            .collect()
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown content type: {}", s)))
    }
}

// =============================================================================
// TAGS
// =============================================================================

/// Who attached a tag to a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagOrigin {
    User,
    Ai,
}

impl TagOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Ai => "AI",
        }
    }
}

impl std::str::FromStr for TagOrigin {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "AI" => Ok(Self::Ai),
            _ => Err(Error::InvalidInput(format!("Unknown tag origin: {}", s))),
        }
    }
}

/// A tag association on a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkTag {
    pub id: Uuid,
    pub name: String,
    pub origin: TagOrigin,
}

// =============================================================================
// BOOKMARK
// =============================================================================

/// A saved bookmark.
///
/// `id` is a UUIDv7, so ordering ids orders bookmarks by creation time;
/// pagination cursors rely on that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: String,
    pub url: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub preview: Option<String>,
    pub og_image_url: Option<String>,
    pub og_description: Option<String>,
    pub favicon_url: Option<String>,
    pub content_type: Option<ContentType>,
    pub status: BookmarkStatus,
    #[serde(skip)]
    pub title_embedding: Option<Vector>,
    #[serde(skip)]
    pub summary_embedding: Option<Vector>,
    pub starred: bool,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    pub tags: Vec<BookmarkTag>,
}

impl Bookmark {
    /// Create a READY bookmark with only the required fields set.
    pub fn new(id: Uuid, user_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            url: url.into(),
            title: None,
            summary: None,
            preview: None,
            og_image_url: None,
            og_description: None,
            favicon_url: None,
            content_type: None,
            status: BookmarkStatus::Ready,
            title_embedding: None,
            summary_embedding: None,
            starred: false,
            read: false,
            created_at: Utc::now(),
            metadata: JsonValue::Null,
            tags: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: BookmarkStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_embeddings(mut self, title: Option<Vector>, summary: Option<Vector>) -> Self {
        self.title_embedding = title;
        self.summary_embedding = summary;
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, origin: TagOrigin) -> Self {
        self.tags.push(BookmarkTag {
            id: Uuid::new_v4(),
            name: name.into(),
            origin,
        });
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Remove fields too large to ship with search results.
///
/// Only objects are touched; other JSON values pass through unchanged.
pub fn clean_metadata(mut metadata: JsonValue) -> JsonValue {
    if let Some(map) = metadata.as_object_mut() {
        map.remove(TRANSCRIPT_METADATA_KEY);
    }
    metadata
}
