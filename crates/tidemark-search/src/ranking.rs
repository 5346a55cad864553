//! Total ordering and cursor pagination of ranked results.

use std::cmp::Ordering;

use uuid::Uuid;

use tidemark_core::{SearchPage, SearchResult};

/// Compare by score descending, then id descending (newest first).
pub fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| b.id.cmp(&a.id))
}

/// Sort results into their stable ranking order.
pub fn sort_search_results(results: &mut [SearchResult]) {
    results.sort_by(compare_results);
}

/// Slice a page out of a fully ranked list.
///
/// The page starts right after `cursor`. A cursor missing from the list
/// restarts from the top rather than failing.
pub fn paginate(ranked: Vec<SearchResult>, cursor: Option<Uuid>, limit: usize) -> SearchPage {
    let total = ranked.len();
    let start = cursor
        .and_then(|id| ranked.iter().position(|r| r.id == id))
        .map_or(0, |position| position + 1);

    let remaining = total.saturating_sub(start);
    let has_more = remaining > limit;

    let bookmarks: Vec<SearchResult> = ranked.into_iter().skip(start).take(limit).collect();
    let next_cursor = if has_more {
        bookmarks.last().map(|r| r.id)
    } else {
        None
    };

    SearchPage {
        bookmarks,
        next_cursor,
        has_more,
        total_count: Some(total),
    }
}
