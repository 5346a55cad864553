//! Vector distance helpers shared by in-process stores and tests.
//!
//! PostgreSQL computes the same values with pgvector's `<=>` operator.

use crate::defaults::{MISSING_EMBEDDING_DISTANCE, SUMMARY_DISTANCE_WEIGHT, TITLE_DISTANCE_WEIGHT};
use crate::models::Vector;

/// Cosine distance (`1 - cosine similarity`), in `[0, 2]`.
///
/// Zero-norm or mismatched-dimension inputs are treated as unrelated and
/// yield the missing-embedding distance.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return MISSING_EMBEDDING_DISTANCE;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return MISSING_EMBEDDING_DISTANCE;
    }

    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    1.0 - similarity
}

/// Blended title/summary distance used by vector search.
pub fn bookmark_distance(
    query: &Vector,
    title_embedding: Option<&Vector>,
    summary_embedding: Option<&Vector>,
) -> f64 {
    let component = |embedding: Option<&Vector>| {
        embedding
            .map(|e| cosine_distance(query.as_slice(), e.as_slice()))
            .unwrap_or(MISSING_EMBEDDING_DISTANCE)
    };

    TITLE_DISTANCE_WEIGHT * component(title_embedding)
        + SUMMARY_DISTANCE_WEIGHT * component(summary_embedding)
}

/// Score for a vector hit: `max(0, 100 * (1 - distance))`.
pub fn distance_to_score(distance: f64) -> f64 {
    (100.0 * (1.0 - distance)).max(0.0)
}
