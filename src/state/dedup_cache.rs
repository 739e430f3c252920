//! Process-wide record dedup cache
//!
//! Maps a product title to the last price it was seen at. A record is emitted
//! only when its (title, price) pair differs from what the cache holds, which
//! makes re-scraping an unchanged listing a no-op.

use crate::ScrapeError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mutex-guarded title → last-seen price map
///
/// The check and the update happen under one lock acquisition, so concurrent
/// callers observing the same (title, price) cannot both see it as new.
/// Entries are never evicted; the cache lives as long as its owner, which
/// for the binary is the whole process.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: Mutex<HashMap<String, f64>>,
}

impl DedupCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation and reports whether it is new
    ///
    /// # Returns
    ///
    /// * `Ok(false)` - The cache already maps `title` to exactly `price`; nothing changed
    /// * `Ok(true)` - The title was unknown or had another price; the cache now holds `price`
    /// * `Err(ScrapeError::Cache)` - The lock was poisoned by a panicking holder
    pub fn check_and_update(&self, title: &str, price: f64) -> Result<bool, ScrapeError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ScrapeError::Cache(format!("Failed to lock dedup cache: {}", e)))?;

        if entries.get(title) == Some(&price) {
            return Ok(false);
        }

        entries.insert(title.to_string(), price);
        Ok(true)
    }

    /// Last price seen for a title
    pub fn get(&self, title: &str) -> Option<f64> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(title).copied())
    }

    /// Number of distinct titles seen
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if no title has been seen yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
