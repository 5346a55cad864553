//! Open-frequency boost.

use std::collections::HashMap;

use uuid::Uuid;

use tidemark_core::defaults::OPEN_FREQUENCY_FACTOR;
use tidemark_core::SearchResult;

/// `score + ln(open_count + 1) * 10`, or `score` when never opened.
pub fn apply_open_frequency_boost(score: f64, open_count: i64) -> f64 {
    if open_count <= 0 {
        return score;
    }
    score + ((open_count as f64) + 1.0).ln() * OPEN_FREQUENCY_FACTOR
}

/// Boost every result by its open count and record the count on it.
pub fn boost_results(results: &mut [SearchResult], open_counts: &HashMap<Uuid, i64>) {
    for result in results.iter_mut() {
        let count = open_counts.get(&result.id).copied().unwrap_or(0);
        result.score = apply_open_frequency_boost(result.score, count);
        result.open_count = Some(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::Bookmark;

    fn boost(count: i64) -> f64 {
        apply_open_frequency_boost(0.0, count)
    }

    #[test]
    fn test_zero_opens_is_identity() {
        assert_eq!(apply_open_frequency_boost(42.5, 0), 42.5);
        assert_eq!(apply_open_frequency_boost(42.5, -3), 42.5);
    }

    #[test]
    fn test_boost_value() {
        let expected = 10.0 + 2f64.ln() * 10.0;
        assert!((apply_open_frequency_boost(10.0, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_boost_is_increasing_and_sublinear() {
        let mut previous = boost(0);
        for count in 1..200 {
            let current = boost(count);
            assert!(current > previous);
            previous = current;
        }
        assert!(boost(100) - boost(10) < 10.0 * (boost(10) - boost(1)));
    }

    #[test]
    fn test_boost_results_records_counts() {
        let opened = SearchResult::from_bookmark(&Bookmark::new(Uuid::now_v7(), "u", "https://a.io"))
            .with_score(10.0);
        let never = SearchResult::from_bookmark(&Bookmark::new(Uuid::now_v7(), "u", "https://b.io"))
            .with_score(10.0);
        let counts = HashMap::from([(opened.id, 4)]);

        let mut results = vec![opened, never];
        boost_results(&mut results, &counts);

        assert!(results[0].score > 10.0);
        assert_eq!(results[0].open_count, Some(4));
        assert_eq!(results[1].score, 10.0);
        assert_eq!(results[1].open_count, Some(0));
    }
}
