//! Run report types
//!
//! A `ScrapeReport` travels with every `ScrapeResult` and makes the faults a
//! run tolerated visible: failed pages, dropped items, failed images.

use crate::state::PageOutcome;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A page that contributed no records because it could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// The failed page number
    pub page: u32,

    /// Outcome the failure mapped to
    pub outcome: PageOutcome,

    /// Error message
    pub reason: String,
}

/// Summary statistics for a scrape run
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    // Page statistics
    pub pages_requested: u32,
    pub pages_by_outcome: HashMap<PageOutcome, u32>,
    pub failed_pages: Vec<PageFailure>,

    /// Unbounded run stopped at the page ceiling rather than at the end of the listing
    pub stopped_early: bool,

    // Item statistics
    pub candidates_found: u64,
    pub items_skipped: u64,
    pub records_emitted: u64,
    pub records_unchanged: u64,
    pub asset_failures: u64,
}

impl Default for ScrapeReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeReport {
    /// Creates an empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_requested: 0,
            pages_by_outcome: HashMap::new(),
            failed_pages: Vec::new(),
            stopped_early: false,
            candidates_found: 0,
            items_skipped: 0,
            records_emitted: 0,
            records_unchanged: 0,
            asset_failures: 0,
        }
    }

    /// Counts one page outcome
    pub fn record_outcome(&mut self, outcome: PageOutcome) {
        *self.pages_by_outcome.entry(outcome).or_insert(0) += 1;
    }

    /// Counts a page that could not be fetched
    pub fn record_failure(&mut self, failure: PageFailure) {
        self.record_outcome(failure.outcome);
        self.failed_pages.push(failure);
    }

    /// Number of pages that ended in `outcome`
    pub fn pages_with(&self, outcome: PageOutcome) -> u32 {
        self.pages_by_outcome.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of pages that failed to fetch
    pub fn pages_failed(&self) -> u32 {
        self.failed_pages.len() as u32
    }

    /// Returns true if every requested page failed
    pub fn all_pages_failed(&self) -> bool {
        self.pages_requested > 0 && self.pages_failed() == self.pages_requested
    }

    /// "N of M pages failed" status line
    pub fn failure_summary(&self) -> String {
        format!(
            "{} of {} pages failed",
            self.pages_failed(),
            self.pages_requested
        )
    }

    /// Marks the run finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Run duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    /// Returns the page success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_requested == 0 {
            return 0.0;
        }
        let ok = self.pages_requested - self.pages_failed();
        (ok as f64 / self.pages_requested as f64) * 100.0
    }
}
