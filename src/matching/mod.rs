//! String similarity used by fuzzy contact search.
//!
//! The search engine depends only on the [`SimilarityScorer`] seam: a score
//! in `0.0..=100.0` that does not care about word order. [`TokenSetScorer`]
//! is the implementation used in production.

pub mod token_set;

pub use token_set::{indel_ratio, token_set_ratio, tokenize, TokenSetScorer};

/// Scores how well a candidate text matches a query, from 0 to 100.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f64;
}
