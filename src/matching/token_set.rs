//! Token-set similarity.
//!
//! Both strings are reduced to sets of lowercase alphanumeric tokens. The
//! shared tokens, and each side's leftovers, are sorted and joined back
//! into strings; the score is the best normalized indel similarity among
//!
//! - `common` vs `common + only_a`
//! - `common` vs `common + only_b`
//! - `common + only_a` vs `common + only_b`
//!
//! so "John Q Public" against "Public John" scores 100, and reordered or
//! partially overlapping names still score well.

use super::SimilarityScorer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Failed to compile token separator regex"));

/// Split text into its set of lowercase alphanumeric tokens.
///
/// Any run of non-alphanumeric characters separates tokens, so
/// `"bob@mail.com"` yields `bob`, `com`, `mail`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TOKEN_SEPARATOR
        .split(&lowered)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized indel similarity of two strings, 0-100.
///
/// `100 * 2 * lcs / (len_a + len_b)`, counted in characters. Two empty
/// strings are identical.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    100.0 * (2 * longest_common_subsequence(&a, &b)) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn join_sections(common: &str, rest: &str) -> String {
    match (common.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => common.to_string(),
        _ => format!("{} {}", common, rest),
    }
}

/// Order-independent token overlap score, 0-100.
///
/// Returns 0 when either side has no tokens and 100 when the two token
/// sets overlap and one contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).map(String::as_str).collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).map(String::as_str).collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).map(String::as_str).collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let common = common.join(" ");
    let with_a = join_sections(&common, &only_a.join(" "));
    let with_b = join_sections(&common, &only_b.join(" "));

    let mut best = indel_ratio(&with_a, &with_b);
    if !common.is_empty() {
        best = best
            .max(indel_ratio(&common, &with_a))
            .max(indel_ratio(&common, &with_b));
    }
    best
}

/// [`SimilarityScorer`] backed by [`token_set_ratio`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetScorer;

impl SimilarityScorer for TokenSetScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        token_set_ratio(query, candidate)
    }
}
