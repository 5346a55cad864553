//! Retrieval strategies against the in-memory store, one tier at a time.

mod common;

use tidemark_db::MemoryBookmarkStore;
use tidemark_search::{
    domain_search, tag_search, vector_search, BookmarkStatus, CommonFilter, ContentType,
    TagOrigin, VectorTier,
};

use common::{bm, id, v, USER};

const LIMIT: usize = 500;

fn search_filter() -> CommonFilter {
    CommonFilter::new(USER).require_ready(true)
}

#[tokio::test]
async fn test_adaptive_tier_when_something_is_close() {
    let store = MemoryBookmarkStore::with_bookmarks(vec![
        bm(1, "https://a.io").with_embeddings(Some(v(1.0, 0.0)), Some(v(1.0, 0.0))),
        bm(2, "https://b.io").with_embeddings(Some(v(0.0, 1.0)), Some(v(0.0, 1.0))),
    ]);

    let outcome = vector_search(&store, &search_filter(), &v(1.0, 0.0), 0.1, 30, LIMIT)
        .await
        .unwrap();
    assert_eq!(outcome.tier, VectorTier::Adaptive);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, id(1));
}

#[tokio::test]
async fn test_relaxed_tier_when_filters_exclude_the_nearest() {
    // The nearest bookmark sets the adaptive bound but is filtered out,
    // leaving only a farther one that needs the relaxed tier.
    let store = MemoryBookmarkStore::with_bookmarks(vec![
        bm(1, "https://a.io")
            .with_content_type(ContentType::Article)
            .with_embeddings(Some(v(1.0, 0.0)), Some(v(1.0, 0.0))),
        bm(2, "https://b.io")
            .with_content_type(ContentType::Video)
            .with_embeddings(Some(v(1.0, 0.0)), Some(v(0.6, 0.8))),
    ]);
    let filter = search_filter().with_types(vec![ContentType::Video]);

    let outcome = vector_search(&store, &filter, &v(1.0, 0.0), 0.1, 30, LIMIT)
        .await
        .unwrap();
    assert_eq!(outcome.tier, VectorTier::Relaxed);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, id(2));
    // distance 0.8 * 0.4 = 0.32
    assert!((outcome.results[0].score - 68.0).abs() < 1e-4);
}

#[tokio::test]
async fn test_top_k_tier_when_nothing_is_within_bounds() {
    let store = MemoryBookmarkStore::with_bookmarks(
        (1..=5u128)
            .map(|n| bm(n, "https://a.io").with_embeddings(Some(v(0.0, 1.0)), Some(v(0.0, 1.0))))
            .collect::<Vec<_>>(),
    );

    let outcome = vector_search(&store, &search_filter(), &v(1.0, 0.0), 0.1, 3, LIMIT)
        .await
        .unwrap();
    assert_eq!(outcome.tier, VectorTier::TopK);
    assert_eq!(outcome.results.len(), 3);
    // Equal distances resolve newest first.
    let ids: Vec<_> = outcome.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![id(5), id(4), id(3)]);
}

#[tokio::test]
async fn test_vector_search_with_no_candidates_at_all() {
    let store = MemoryBookmarkStore::new();
    let outcome = vector_search(&store, &search_filter(), &v(1.0, 0.0), 0.1, 30, LIMIT)
        .await
        .unwrap();
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.tier, VectorTier::TopK);
}

#[tokio::test]
async fn test_vector_search_skips_unready_bookmarks() {
    let store = MemoryBookmarkStore::with_bookmarks(vec![bm(1, "https://a.io")
        .with_status(BookmarkStatus::Pending)
        .with_embeddings(Some(v(1.0, 0.0)), Some(v(1.0, 0.0)))]);

    let outcome = vector_search(&store, &search_filter(), &v(1.0, 0.0), 0.1, 30, LIMIT)
        .await
        .unwrap();
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn test_tag_search_with_no_tags_skips_storage() {
    let store = MemoryBookmarkStore::with_bookmarks(vec![
        bm(1, "https://a.io").with_tag("x", TagOrigin::User)
    ]);
    let results = tag_search(&store, &search_filter(), &[], LIMIT).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_tag_search_respects_candidate_limit() {
    let store = MemoryBookmarkStore::with_bookmarks(
        (1..=10u128)
            .map(|n| bm(n, "https://a.io").with_tag("x", TagOrigin::User))
            .collect::<Vec<_>>(),
    );
    let results = tag_search(&store, &search_filter(), &["x".to_string()], 4)
        .await
        .unwrap();
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn test_domain_search_drops_path_only_mentions() {
    let store = MemoryBookmarkStore::with_bookmarks(vec![
        bm(1, "https://docs.rs/tokio"),
        bm(2, "https://example.com/?u=https://docs.rs"),
    ]);
    let results = domain_search(&store, &search_filter(), "docs.rs", LIMIT)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id(1));
    assert_eq!(results[0].score, 150.0);
}
