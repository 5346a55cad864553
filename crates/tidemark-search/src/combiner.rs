//! Merge strategy outputs into one deduplicated result set.

use std::collections::HashMap;

use uuid::Uuid;

use tidemark_core::defaults::{TAG_SCORE_BOOST, VECTOR_COMBINED_WEIGHT};
use tidemark_core::{MatchType, SearchResult, StrategyKind};

/// Outputs of the strategies that ran, by strategy.
///
/// `None` means the strategy did not run (or failed and was dropped).
#[derive(Debug, Clone, Default)]
pub struct StrategyResults {
    pub tag: Option<Vec<SearchResult>>,
    pub domain: Option<Vec<SearchResult>>,
    pub vector: Option<Vec<SearchResult>>,
}

impl StrategyResults {
    /// Strategies that produced output, in merge order.
    pub fn ran(&self) -> Vec<StrategyKind> {
        let mut ran = Vec::new();
        if self.tag.is_some() {
            ran.push(StrategyKind::Tag);
        }
        if self.domain.is_some() {
            ran.push(StrategyKind::Domain);
        }
        if self.vector.is_some() {
            ran.push(StrategyKind::Vector);
        }
        ran
    }
}

/// Deduplicate by id and merge scores.
///
/// Tag results enter first with their score multiplied by the tag boost.
/// Domain results add to an existing entry or enter as `tag` matches.
/// Vector results add a damped share to an existing entry or enter as
/// `vector` matches. Any entry touched twice becomes `combined`.
pub fn combine_results(results: StrategyResults) -> Vec<SearchResult> {
    let mut merged: HashMap<Uuid, SearchResult> = HashMap::new();

    for mut result in results.tag.unwrap_or_default() {
        result.score *= TAG_SCORE_BOOST;
        result.match_type = Some(MatchType::Tag);
        merged.entry(result.id).or_insert(result);
    }

    for mut result in results.domain.unwrap_or_default() {
        match merged.get_mut(&result.id) {
            Some(existing) => {
                existing.score += result.score;
                existing.match_type = Some(MatchType::Combined);
            }
            None => {
                // Domain-only hits are presented as tag matches.
                result.match_type = Some(MatchType::Tag);
                merged.insert(result.id, result);
            }
        }
    }

    for mut result in results.vector.unwrap_or_default() {
        match merged.get_mut(&result.id) {
            Some(existing) => {
                existing.score += result.score * VECTOR_COMBINED_WEIGHT;
                existing.match_type = Some(MatchType::Combined);
            }
            None => {
                result.match_type = Some(MatchType::Vector);
                merged.insert(result.id, result);
            }
        }
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::Bookmark;

    fn hit(id: Uuid, score: f64) -> SearchResult {
        SearchResult::from_bookmark(&Bookmark::new(id, "u", "https://example.com")).with_score(score)
    }

    fn by_id(results: &[SearchResult], id: Uuid) -> &SearchResult {
        results.iter().find(|r| r.id == id).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tag_only_is_boosted() {
        let id = Uuid::now_v7();
        let merged = combine_results(StrategyResults {
            tag: Some(vec![hit(id, 50.0)]),
            ..Default::default()
        });
        assert_eq!(merged.len(), 1);
        assert!(approx(merged[0].score, 75.0));
        assert_eq!(merged[0].match_type, Some(MatchType::Tag));
    }

    #[test]
    fn test_tag_and_domain_sum_to_combined() {
        let id = Uuid::now_v7();
        let merged = combine_results(StrategyResults {
            tag: Some(vec![hit(id, 100.0)]),
            domain: Some(vec![hit(id, 150.0)]),
            vector: None,
        });
        assert_eq!(merged.len(), 1);
        assert!(approx(merged[0].score, 100.0 * 1.5 + 150.0));
        assert_eq!(merged[0].match_type, Some(MatchType::Combined));
    }

    #[test]
    fn test_domain_only_hit_is_labelled_tag() {
        let id = Uuid::now_v7();
        let merged = combine_results(StrategyResults {
            domain: Some(vec![hit(id, 120.0)]),
            ..Default::default()
        });
        assert!(approx(merged[0].score, 120.0));
        assert_eq!(merged[0].match_type, Some(MatchType::Tag));
    }

    #[test]
    fn test_vector_corroboration_is_damped() {
        let shared = Uuid::now_v7();
        let vector_only = Uuid::now_v7();
        let merged = combine_results(StrategyResults {
            tag: Some(vec![hit(shared, 100.0)]),
            domain: None,
            vector: Some(vec![hit(shared, 80.0), hit(vector_only, 90.0)]),
        });

        assert_eq!(merged.len(), 2);
        let combined = by_id(&merged, shared);
        assert!(approx(combined.score, 150.0 + 80.0 * 0.6));
        assert_eq!(combined.match_type, Some(MatchType::Combined));

        let alone = by_id(&merged, vector_only);
        assert!(approx(alone.score, 90.0));
        assert_eq!(alone.match_type, Some(MatchType::Vector));
    }

    #[test]
    fn test_all_three_strategies() {
        let id = Uuid::now_v7();
        let merged = combine_results(StrategyResults {
            tag: Some(vec![hit(id, 100.0)]),
            domain: Some(vec![hit(id, 120.0)]),
            vector: Some(vec![hit(id, 50.0)]),
        });
        assert!(approx(merged[0].score, 150.0 + 120.0 + 30.0));
        assert_eq!(merged[0].match_type, Some(MatchType::Combined));
    }

    #[test]
    fn test_matched_tags_survive_merge() {
        let id = Uuid::now_v7();
        let mut tagged = hit(id, 100.0);
        tagged.matched_tags = Some(vec!["rust".to_string()]);
        let merged = combine_results(StrategyResults {
            tag: Some(vec![tagged]),
            domain: None,
            vector: Some(vec![hit(id, 10.0)]),
        });
        assert_eq!(merged[0].matched_tags, Some(vec!["rust".to_string()]));
    }

    #[test]
    fn test_ran_lists_strategies_in_merge_order() {
        let results = StrategyResults {
            tag: Some(Vec::new()),
            domain: None,
            vector: Some(Vec::new()),
        };
        assert_eq!(results.ran(), vec![StrategyKind::Tag, StrategyKind::Vector]);
        assert!(StrategyResults::default().ran().is_empty());
        assert!(combine_results(StrategyResults::default()).is_empty());
    }
}
