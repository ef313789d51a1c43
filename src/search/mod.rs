//! Contact search.
//!
//! This module provides the two-tier search over one user's contacts:
//! exact substring matching for very short queries and token-set fuzzy
//! ranking for everything longer.

pub mod engine;

pub use engine::{SearchEngine, SearchMode, SearchOptions, SearchResult};
