//! Output module for run reports
//!
//! This module handles:
//! - Collecting per-run statistics (pages, items, image failures)
//! - Rendering them for the terminal

mod report;
pub mod stats;

pub use report::{PageFailure, ScrapeReport};
pub use stats::{format_report, print_report};
