/// Page outcome definitions for a scrape run
///
/// Every page a run issues ends in exactly one of these outcomes.
use std::fmt;

/// Terminal outcome of one listing page within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Page was fetched and yielded at least one candidate record
    Scraped,

    /// Page was fetched but held no product listing (past the last real page)
    Empty,

    /// Server answered 404 for the page
    NotFound,

    /// Page could not be fetched after exhausting retries
    FetchFailed,
}

impl PageOutcome {
    /// Returns true if this page marks the end of the listing
    ///
    /// Runs without a page limit stop issuing new pages once a wave
    /// contains an end-of-listing page.
    pub fn is_end_of_listing(&self) -> bool {
        matches!(self, Self::Empty | Self::NotFound)
    }

    /// Short lowercase label used in logs and stored runs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraped => "scraped",
            Self::Empty => "empty",
            Self::NotFound => "not_found",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
