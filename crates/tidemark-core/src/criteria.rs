//! Retrieval criteria passed from the search pipeline to storage.
//!
//! Each retrieval strategy is a separate criteria variant that storage
//! compiles on its own. Strategies never share query fragments; the only
//! shared piece is [`CommonFilter`].

use uuid::Uuid;

use crate::defaults::{RELAXED_MATCHING_DISTANCE, STRATEGY_CANDIDATE_LIMIT};
use crate::models::{Bookmark, BookmarkStatus, ContentType, Vector};
use crate::search::{SearchRequest, SpecialFilter, VectorTier};

/// Filters every strategy applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonFilter {
    pub user_id: String,
    /// Inclusion list; empty means any type.
    pub types: Vec<ContentType>,
    /// OR-combined; empty means no restriction.
    pub special_filters: Vec<SpecialFilter>,
    /// Restrict to READY bookmarks (searches) or allow any status (browsing).
    pub require_ready: bool,
}

impl CommonFilter {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            types: Vec::new(),
            special_filters: Vec::new(),
            require_ready: false,
        }
    }

    /// Build the filter from a request. `require_ready` is set by the caller
    /// once it knows whether the request is a search.
    pub fn from_request(request: &SearchRequest, require_ready: bool) -> Self {
        Self {
            user_id: request.user_id.clone(),
            types: request.type_filter(),
            special_filters: request.special_filter_set(),
            require_ready,
        }
    }

    pub fn with_types(mut self, types: Vec<ContentType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_special_filters(mut self, filters: Vec<SpecialFilter>) -> Self {
        self.special_filters = filters;
        self
    }

    pub fn require_ready(mut self, require: bool) -> Self {
        self.require_ready = require;
        self
    }

    /// Ownership and status check, without type or special filters.
    pub fn admits_owner_and_status(&self, bookmark: &Bookmark) -> bool {
        bookmark.user_id == self.user_id
            && (!self.require_ready || bookmark.status == BookmarkStatus::Ready)
    }

    /// Type and special-filter check.
    pub fn admits_content(&self, bookmark: &Bookmark) -> bool {
        let type_ok = self.types.is_empty()
            || bookmark
                .content_type
                .is_some_and(|t| self.types.contains(&t));

        let special_ok = self.special_filters.is_empty()
            || self
                .special_filters
                .iter()
                .any(|f| f.matches(bookmark.content_type, bookmark.read, bookmark.starred));

        type_ok && special_ok
    }

    /// Full filter check.
    pub fn admits(&self, bookmark: &Bookmark) -> bool {
        self.admits_owner_and_status(bookmark) && self.admits_content(bookmark)
    }
}

/// Bookmarks owning at least one of the given tag names.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCriteria {
    pub filter: CommonFilter,
    /// Lowercased tag names.
    pub tags: Vec<String>,
    pub limit: usize,
}

impl TagCriteria {
    pub fn new(filter: CommonFilter, tags: Vec<String>) -> Self {
        Self {
            filter,
            tags,
            limit: STRATEGY_CANDIDATE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Bookmarks whose URL contains a canonical domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainCriteria {
    pub filter: CommonFilter,
    /// Canonical (lowercased, scheme- and www-stripped) domain.
    pub domain: String,
    pub limit: usize,
}

impl DomainCriteria {
    pub fn new(filter: CommonFilter, domain: impl Into<String>) -> Self {
        Self {
            filter,
            domain: domain.into(),
            limit: STRATEGY_CANDIDATE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Threshold applied by one vector tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VectorThreshold {
    /// Keep candidates within `matching_distance` of the closest eligible
    /// bookmark, below the missing-embedding sanity bound.
    Adaptive { matching_distance: f64 },
    /// Keep the `k` nearest candidates regardless of distance.
    TopK { k: usize },
}

/// Bookmarks near a query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCriteria {
    pub filter: CommonFilter,
    pub embedding: Vector,
    pub threshold: VectorThreshold,
    pub limit: usize,
}

impl VectorCriteria {
    pub fn new(filter: CommonFilter, embedding: Vector, threshold: VectorThreshold) -> Self {
        Self {
            filter,
            embedding,
            threshold,
            limit: STRATEGY_CANDIDATE_LIMIT,
        }
    }

    /// Criteria for a given escalation tier.
    pub fn for_tier(
        filter: CommonFilter,
        embedding: Vector,
        tier: VectorTier,
        matching_distance: f64,
        top_k: usize,
    ) -> Self {
        let threshold = match tier {
            VectorTier::Adaptive => VectorThreshold::Adaptive { matching_distance },
            VectorTier::Relaxed => VectorThreshold::Adaptive {
                matching_distance: RELAXED_MATCHING_DISTANCE,
            },
            VectorTier::TopK => VectorThreshold::TopK { k: top_k },
        };
        Self::new(filter, embedding, threshold)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Default browsing: newest first, keyset-paginated by id.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseCriteria {
    pub filter: CommonFilter,
    /// Return only ids strictly below this one.
    pub before: Option<Uuid>,
    pub limit: usize,
}

impl BrowseCriteria {
    pub fn new(filter: CommonFilter, before: Option<Uuid>, limit: usize) -> Self {
        Self {
            filter,
            before,
            limit,
        }
    }
}

/// A storage query, one variant per retrieval path.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Tag(TagCriteria),
    Domain(DomainCriteria),
    Vector(VectorCriteria),
    Browse(BrowseCriteria),
}

impl Criteria {
    pub fn filter(&self) -> &CommonFilter {
        match self {
            Criteria::Tag(c) => &c.filter,
            Criteria::Domain(c) => &c.filter,
            Criteria::Vector(c) => &c.filter,
            Criteria::Browse(c) => &c.filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagOrigin;

    fn bookmark(user: &str) -> Bookmark {
        Bookmark::new(Uuid::now_v7(), user, "https://example.com")
    }

    #[test]
    fn test_filter_rejects_other_users() {
        let filter = CommonFilter::new("alice");
        assert!(filter.admits(&bookmark("alice")));
        assert!(!filter.admits(&bookmark("bob")));
    }

    #[test]
    fn test_filter_ready_requirement() {
        let pending = bookmark("alice").with_status(BookmarkStatus::Pending);
        assert!(CommonFilter::new("alice").admits(&pending));
        assert!(!CommonFilter::new("alice").require_ready(true).admits(&pending));
    }

    #[test]
    fn test_filter_type_inclusion() {
        let filter = CommonFilter::new("alice").with_types(vec![ContentType::Video]);
        assert!(filter.admits(&bookmark("alice").with_content_type(ContentType::Video)));
        assert!(!filter.admits(&bookmark("alice").with_content_type(ContentType::Article)));
        assert!(!filter.admits(&bookmark("alice")));
    }

    #[test]
    fn test_special_filters_are_or_combined() {
        let filter = CommonFilter::new("alice")
            .with_special_filters(vec![SpecialFilter::Read, SpecialFilter::Star]);

        let read_article = bookmark("alice")
            .with_content_type(ContentType::Article)
            .read(true);
        let starred_image = bookmark("alice")
            .with_content_type(ContentType::Image)
            .starred(true);
        let read_image = bookmark("alice")
            .with_content_type(ContentType::Image)
            .read(true);
        let unread_article = bookmark("alice")
            .with_content_type(ContentType::Article)
            .with_tag("x", TagOrigin::Ai);

        assert!(filter.admits(&read_article));
        assert!(filter.admits(&starred_image));
        assert!(!filter.admits(&read_image));
        assert!(!filter.admits(&unread_article));
    }

    #[test]
    fn test_vector_criteria_for_tier() {
        let filter = CommonFilter::new("alice");
        let embedding = Vector::from(vec![1.0, 0.0]);

        let adaptive =
            VectorCriteria::for_tier(filter.clone(), embedding.clone(), VectorTier::Adaptive, 0.1, 5);
        assert_eq!(
            adaptive.threshold,
            VectorThreshold::Adaptive {
                matching_distance: 0.1
            }
        );

        let relaxed =
            VectorCriteria::for_tier(filter.clone(), embedding.clone(), VectorTier::Relaxed, 0.1, 5);
        assert_eq!(
            relaxed.threshold,
            VectorThreshold::Adaptive {
                matching_distance: 1.0
            }
        );

        let top_k = VectorCriteria::for_tier(filter, embedding, VectorTier::TopK, 0.1, 5);
        assert_eq!(top_k.threshold, VectorThreshold::TopK { k: 5 });
    }
}
