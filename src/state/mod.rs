//! State module for tracking scrape progress
//!
//! # Components
//!
//! - `DedupCache`: Process-lifetime title → price map deciding which records are new
//! - `PageOutcome`: Terminal outcome of each listing page within a run

mod dedup_cache;
mod page_outcome;

// Re-export main types
pub use dedup_cache::DedupCache;
pub use page_outcome::PageOutcome;
