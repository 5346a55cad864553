//! PostgreSQL integration tests for the bookmark and open-event repositories.
//!
//! **IMPORTANT**: These tests require a PostgreSQL database with the pgvector
//! extension available. Run with `cargo test -p tidemark-db -- --ignored`.

use serde_json::json;
use uuid::Uuid;

use tidemark_db::test_fixtures::TestDatabase;
use tidemark_db::{
    BookmarkStatus, BookmarkStore, BrowseCriteria, CommonFilter, ContentType, DomainCriteria,
    Error, OpenCountSource, SpecialFilter, TagCriteria, TagOrigin, Vector, VectorCriteria,
    VectorThreshold,
};

/// Unit vector along one axis, at the production embedding dimension.
fn axis(index: usize) -> Vector {
    let mut values = vec![0.0f32; 768];
    values[index] = 1.0;
    Vector::from(values)
}

/// Mostly along axis 0, tilted towards axis 1.
fn tilted(tilt: f32) -> Vector {
    let mut values = vec![0.0f32; 768];
    values[0] = 1.0;
    values[1] = tilt;
    Vector::from(values)
}

#[tokio::test]
#[ignore]
async fn test_tag_candidates_match_case_insensitively() {
    let test_db = TestDatabase::new().await;
    let tagged = test_db
        .bookmark("https://a.example")
        .with_tag("Rust", TagOrigin::User)
        .with_tag("async", TagOrigin::Ai);
    let other = test_db
        .bookmark("https://b.example")
        .with_tag("python", TagOrigin::User);
    test_db.seed(&tagged).await;
    test_db.seed(&other).await;

    let criteria = TagCriteria::new(
        CommonFilter::new(&test_db.user_id).require_ready(true),
        vec!["rust".to_string(), "go".to_string()],
    );
    let results = test_db.db.bookmarks.tag_candidates(&criteria).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, tagged.id);
    assert_eq!(results[0].matched_tags, Some(vec!["rust".to_string()]));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_search_excludes_non_ready_but_browse_includes_them() {
    let test_db = TestDatabase::new().await;
    let pending = test_db
        .bookmark("https://pending.example")
        .with_status(BookmarkStatus::Pending)
        .with_tag("rust", TagOrigin::User);
    test_db.seed(&pending).await;

    let search = TagCriteria::new(
        CommonFilter::new(&test_db.user_id).require_ready(true),
        vec!["rust".to_string()],
    );
    assert!(test_db.db.bookmarks.tag_candidates(&search).await.unwrap().is_empty());

    let browse = BrowseCriteria::new(CommonFilter::new(&test_db.user_id), None, 10);
    let page = test_db.db.bookmarks.browse(&browse).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].status, BookmarkStatus::Pending);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_domain_candidates_and_metadata_cleaning() {
    let test_db = TestDatabase::new().await;
    let hit = test_db
        .bookmark("https://Docs.Example.com/guide")
        .with_metadata(json!({"transcript": "very long", "lang": "en"}));
    test_db.seed(&hit).await;
    test_db.seed(&test_db.bookmark("https://other.org")).await;

    let criteria = DomainCriteria::new(
        CommonFilter::new(&test_db.user_id).require_ready(true),
        "example.com",
    );
    let results = test_db.db.bookmarks.domain_candidates(&criteria).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, hit.id);
    assert_eq!(results[0].metadata, json!({"lang": "en"}));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_vector_tiers() {
    let test_db = TestDatabase::new().await;
    let near_image = test_db
        .bookmark("https://img.example")
        .with_content_type(ContentType::Image)
        .with_embeddings(Some(axis(0)), Some(axis(0)));
    let article = test_db
        .bookmark("https://article.example")
        .with_content_type(ContentType::Article)
        .with_embeddings(Some(tilted(0.6)), Some(tilted(0.6)));
    let bare = test_db
        .bookmark("https://bare.example")
        .with_content_type(ContentType::Article);
    for b in [&near_image, &article, &bare] {
        test_db.seed(b).await;
    }

    let filter = CommonFilter::new(&test_db.user_id)
        .require_ready(true)
        .with_types(vec![ContentType::Article]);

    let adaptive = VectorCriteria::new(
        filter.clone(),
        axis(0),
        VectorThreshold::Adaptive {
            matching_distance: 0.1,
        },
    );
    assert!(test_db
        .db
        .bookmarks
        .vector_candidates(&adaptive)
        .await
        .unwrap()
        .is_empty());

    let relaxed = VectorCriteria::new(
        filter.clone(),
        axis(0),
        VectorThreshold::Adaptive {
            matching_distance: 1.0,
        },
    );
    let hits = test_db.db.bookmarks.vector_candidates(&relaxed).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].result.id, article.id);

    let top_k = VectorCriteria::new(filter, axis(0), VectorThreshold::TopK { k: 10 });
    let hits = test_db.db.bookmarks.vector_candidates(&top_k).await.unwrap();
    assert_eq!(
        hits.iter().map(|h| h.result.id).collect::<Vec<_>>(),
        vec![article.id, bare.id]
    );
    assert!((hits[1].distance - 1.0).abs() < 1e-9);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_special_filters_are_a_union() {
    let test_db = TestDatabase::new().await;
    let read_article = test_db
        .bookmark("https://r.example")
        .with_content_type(ContentType::Article)
        .read(true);
    let starred_pdf = test_db
        .bookmark("https://s.example")
        .with_content_type(ContentType::Pdf)
        .starred(true);
    let read_image = test_db
        .bookmark("https://i.example")
        .with_content_type(ContentType::Image)
        .read(true);
    for b in [&read_article, &starred_pdf, &read_image] {
        test_db.seed(b).await;
    }

    let filter = CommonFilter::new(&test_db.user_id)
        .with_special_filters(vec![SpecialFilter::Read, SpecialFilter::Star]);
    let page = test_db
        .db
        .bookmarks
        .browse(&BrowseCriteria::new(filter, None, 10))
        .await
        .unwrap();

    let mut ids: Vec<Uuid> = page.iter().map(|r| r.id).collect();
    ids.sort();
    let mut expected = vec![read_article.id, starred_pdf.id];
    expected.sort();
    assert_eq!(ids, expected);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_browse_cursor_is_exclusive() {
    let test_db = TestDatabase::new().await;
    let bookmarks: Vec<_> = (0..3)
        .map(|i| test_db.bookmark(&format!("https://{}.example", i)))
        .collect();
    for b in &bookmarks {
        test_db.seed(b).await;
    }

    let criteria =
        BrowseCriteria::new(CommonFilter::new(&test_db.user_id), Some(bookmarks[2].id), 10);
    let page = test_db.db.bookmarks.browse(&criteria).await.unwrap();
    assert_eq!(
        page.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![bookmarks[1].id, bookmarks[0].id]
    );

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_open_counts_round_trip() {
    let test_db = TestDatabase::new().await;
    let bookmark = test_db.bookmark("https://example.com");
    test_db.seed(&bookmark).await;

    let opens = &test_db.db.opens;
    opens.record_open(&test_db.user_id, bookmark.id).await.unwrap();
    opens.record_open(&test_db.user_id, bookmark.id).await.unwrap();

    let counts = opens
        .open_counts(&test_db.user_id, &[bookmark.id, Uuid::now_v7()])
        .await
        .unwrap();
    assert_eq!(counts.get(&bookmark.id), Some(&2));
    assert_eq!(counts.len(), 1);

    let missing = opens.record_open(&test_db.user_id, Uuid::now_v7()).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_limit_applies_after_match_strength_ordering() {
    let test_db = TestDatabase::new().await;
    let full = test_db
        .bookmark("https://www.example.com/full")
        .with_tag("a", TagOrigin::User)
        .with_tag("b", TagOrigin::User);
    test_db.seed(&full).await;
    for url in ["https://blog.example.com/1", "https://docs.example.com/2"] {
        let partial = test_db.bookmark(url).with_tag("a", TagOrigin::User);
        test_db.seed(&partial).await;
    }
    let filter = CommonFilter::new(&test_db.user_id).require_ready(true);

    let tags = TagCriteria::new(filter.clone(), vec!["a".to_string(), "b".to_string()])
        .with_limit(1);
    let results = test_db.db.bookmarks.tag_candidates(&tags).await.unwrap();
    assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![full.id]);

    let domain = DomainCriteria::new(filter, "example.com").with_limit(1);
    let results = test_db.db.bookmarks.domain_candidates(&domain).await.unwrap();
    assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![full.id]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_embedding_dimension_check_against_schema() {
    let test_db = TestDatabase::new().await;

    assert!(test_db.db.verify_embedding_dimension(768).await.is_ok());
    let mismatch = test_db.db.verify_embedding_dimension(1024).await;
    assert!(matches!(mismatch, Err(Error::Config(_))));

    test_db.cleanup().await;
}
