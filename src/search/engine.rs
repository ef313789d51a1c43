//! Two-tier contact search engine.
//!
//! The engine is a pure function over a snapshot of one user's contacts:
//!
//! - blank query: every contact, in store order
//! - short query (up to `short_query_max_chars` characters): case-insensitive
//!   substring match on name, phone and email, in store order
//! - longer query: token-set similarity against `name phone email`, keep the
//!   best `max_candidates`, then drop anything scoring `min_score` or less

use crate::matching::{SimilarityScorer, TokenSetScorer};
use crate::models::Contact;
use serde::Serialize;

/// Which tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Blank query, nothing filtered
    All,
    /// Short query, case-insensitive substring match
    Substring,
    /// Long query, ranked by token-set similarity
    Fuzzy,
}

/// Tunables for the search tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Queries with at most this many characters use substring matching
    pub short_query_max_chars: usize,

    /// Fuzzy ranking keeps at most this many candidates
    pub max_candidates: usize,

    /// Fuzzy candidates must score strictly above this (0-100)
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            short_query_max_chars: 2,
            max_candidates: 10,
            min_score: 30.0,
        }
    }
}

/// Search output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    /// Matching contacts, best first in fuzzy mode, store order otherwise
    pub results: Vec<Contact>,

    /// The query exactly as received
    pub query: String,

    /// Number of entries in `results`
    pub total: usize,

    pub mode: SearchMode,
}

impl SearchResult {
    fn new(results: Vec<Contact>, query: &str, mode: SearchMode) -> Self {
        Self {
            total: results.len(),
            results,
            query: query.to_string(),
            mode,
        }
    }
}

/// Stateless search over a contact snapshot.
#[derive(Debug, Clone)]
pub struct SearchEngine<S = TokenSetScorer> {
    options: SearchOptions,
    scorer: S,
}

impl SearchEngine<TokenSetScorer> {
    /// Create an engine using token-set similarity.
    pub fn new(options: SearchOptions) -> Self {
        Self::with_scorer(options, TokenSetScorer)
    }
}

impl Default for SearchEngine<TokenSetScorer> {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl<S: SimilarityScorer> SearchEngine<S> {
    /// Create an engine with a custom similarity scorer.
    pub fn with_scorer(options: SearchOptions, scorer: S) -> Self {
        Self { options, scorer }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Filter and rank `contacts` against `query`.
    ///
    /// Never fails: an empty contact set or a query matching nothing
    /// yields an empty result.
    pub fn search(&self, contacts: &[Contact], query: &str) -> SearchResult {
        let trimmed = query.trim();

        let result = if trimmed.is_empty() {
            SearchResult::new(contacts.to_vec(), query, SearchMode::All)
        } else if trimmed.chars().count() <= self.options.short_query_max_chars {
            SearchResult::new(
                Self::substring_matches(contacts, trimmed),
                query,
                SearchMode::Substring,
            )
        } else {
            SearchResult::new(self.fuzzy_matches(contacts, trimmed), query, SearchMode::Fuzzy)
        };

        tracing::debug!(
            mode = ?result.mode,
            candidates = contacts.len(),
            matched = result.total,
            "Contact search completed"
        );

        result
    }

    fn substring_matches(contacts: &[Contact], query: &str) -> Vec<Contact> {
        let needle = query.to_lowercase();

        contacts
            .iter()
            .filter(|contact| {
                contact.name.to_lowercase().contains(&needle)
                    || contact.phone.as_str().contains(&needle)
                    || contact
                        .email
                        .as_ref()
                        .map(|email| email.normalized().contains(&needle))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn fuzzy_matches(&self, contacts: &[Contact], query: &str) -> Vec<Contact> {
        let mut scored: Vec<(usize, f64)> = contacts
            .iter()
            .enumerate()
            .map(|(index, contact)| (index, self.scorer.score(query, &contact.search_text())))
            .collect();

        // Stable sort: equal scores keep store order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.options.max_candidates);

        scored
            .into_iter()
            .filter(|(_, score)| *score > self.options.min_score)
            .map(|(index, _)| contacts[index].clone())
            .collect()
    }
}
