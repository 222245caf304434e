//! Subsequence fuzzy matching and ranking over a fixed vocabulary.
//!
//! A query matches a candidate when every character of the query shows up in the candidate in
//! the same order, ignoring case. Matches are ranked so that prefix matches come first, then
//! shorter candidates. Ties keep the order of the vocabulary.

use std::sync::Arc;

use tracing::trace;

/// Returns true when `query` is a case-insensitive subsequence of `candidate`.
/// The empty query matches everything, including the empty candidate.
pub fn is_subsequence_match(query: &str, candidate: &str) -> bool {
    let mut candidate = candidate.chars().flat_map(char::to_lowercase);
    query
        .chars()
        .flat_map(char::to_lowercase)
        .all(|needle| candidate.any(|c| c == needle))
}

/// Returns true when `candidate`, lowercased, starts with `query`, lowercased.
pub fn is_prefix_match(query: &str, candidate: &str) -> bool {
    let mut candidate = candidate.chars().flat_map(char::to_lowercase);
    query
        .chars()
        .flat_map(char::to_lowercase)
        .all(|needle| candidate.next() == Some(needle))
}

/// Filters `candidates` down to subsequence matches of `query` and ranks them.
///
/// Ordering: prefix matches before scattered ones, then shorter before longer. The sort is
/// stable, so candidates that tie on both keys keep their relative input order.
pub fn rank_matches<S: AsRef<str>>(query: &str, candidates: &[S]) -> Vec<String> {
    let mut matches = candidates
        .iter()
        .map(|candidate| candidate.as_ref())
        .filter(|candidate| is_subsequence_match(query, candidate))
        .collect::<Vec<_>>();

    matches.sort_by_key(|candidate| {
        (
            !is_prefix_match(query, candidate),
            candidate.chars().count(),
        )
    });

    trace!(
        "Ranked {} of {} candidates for {query:?}",
        matches.len(),
        candidates.len()
    );
    matches.into_iter().map(str::to_string).collect()
}

/// Owns a candidate vocabulary that stays fixed for the lifetime of a matching session.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    candidates: Arc<[String]>,
}

impl FuzzyMatcher {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Same as [rank_matches] against the owned vocabulary.
    pub fn rank(&self, query: &str) -> Vec<String> {
        rank_matches(query, self.candidates())
    }
}
