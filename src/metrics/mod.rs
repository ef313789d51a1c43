//! Basic metrics instrumentation.
//!
//! Provides counters for contact searches and duplicate repairs.

use crate::search::SearchMode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector shared by the service layer and the resolver.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Searches answered without filtering (blank query)
    searches_all: Arc<AtomicU64>,

    /// Searches answered by substring matching
    searches_substring: Arc<AtomicU64>,

    /// Searches answered by fuzzy ranking
    searches_fuzzy: Arc<AtomicU64>,

    /// Contacts returned across all searches
    search_results_total: Arc<AtomicU64>,

    /// Contacts deleted by duplicate repair
    duplicates_removed_total: Arc<AtomicU64>,

    /// Duplicate groups that could not be repaired
    repair_failures_total: Arc<AtomicU64>,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed search.
    pub fn record_search(&self, mode: SearchMode, result_count: usize) {
        let counter = match mode {
            SearchMode::All => &self.searches_all,
            SearchMode::Substring => &self.searches_substring,
            SearchMode::Fuzzy => &self.searches_fuzzy,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.search_results_total
            .fetch_add(result_count as u64, Ordering::Relaxed);
    }

    /// Record contacts removed while repairing one group.
    pub fn record_duplicates_removed(&self, count: usize) {
        self.duplicates_removed_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a group that could not be repaired.
    pub fn record_repair_failure(&self) {
        self.repair_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total searches across all modes.
    pub fn searches_total(&self) -> u64 {
        self.searches_all.load(Ordering::Relaxed)
            + self.searches_substring.load(Ordering::Relaxed)
            + self.searches_fuzzy.load(Ordering::Relaxed)
    }

    /// Get a snapshot of every counter.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            searches_all: self.searches_all.load(Ordering::Relaxed),
            searches_substring: self.searches_substring.load(Ordering::Relaxed),
            searches_fuzzy: self.searches_fuzzy.load(Ordering::Relaxed),
            search_results_total: self.search_results_total.load(Ordering::Relaxed),
            duplicates_removed_total: self.duplicates_removed_total.load(Ordering::Relaxed),
            repair_failures_total: self.repair_failures_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSummary {
    pub searches_all: u64,
    pub searches_substring: u64,
    pub searches_fuzzy: u64,
    pub search_results_total: u64,
    pub duplicates_removed_total: u64,
    pub repair_failures_total: u64,
}

impl MetricsSummary {
    /// Average contacts returned per search.
    pub fn avg_results_per_search(&self) -> f64 {
        let searches = self.searches_all + self.searches_substring + self.searches_fuzzy;
        if searches == 0 {
            0.0
        } else {
            self.search_results_total as f64 / searches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_counters() {
        let metrics = Metrics::new();
        metrics.record_search(SearchMode::All, 4);
        metrics.record_search(SearchMode::Fuzzy, 2);
        metrics.record_search(SearchMode::Fuzzy, 0);

        let summary = metrics.summary();
        assert_eq!(summary.searches_all, 1);
        assert_eq!(summary.searches_fuzzy, 2);
        assert_eq!(summary.searches_substring, 0);
        assert_eq!(summary.search_results_total, 6);
        assert_eq!(metrics.searches_total(), 3);
        assert_eq!(summary.avg_results_per_search(), 2.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.record_duplicates_removed(2);
        clone.record_repair_failure();

        let summary = metrics.summary();
        assert_eq!(summary.duplicates_removed_total, 2);
        assert_eq!(summary.repair_failures_total, 1);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(MetricsSummary::default().avg_results_per_search(), 0.0);
    }
}
