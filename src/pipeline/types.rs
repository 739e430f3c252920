//! Data carried through a scrape run

use crate::output::ScrapeReport;
use serde::{Deserialize, Serialize};

/// Input of one scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// Number of listing pages to fetch; `None` scrapes until the listing ends
    pub max_pages: Option<u32>,

    /// Proxy URL for every request of this run
    pub proxy: Option<String>,
}

impl ScrapeRequest {
    /// Request for exactly `max_pages` pages
    pub fn with_max_pages(max_pages: u32) -> Self {
        Self {
            max_pages: Some(max_pages),
            proxy: None,
        }
    }
}

/// Markup of one listing page, consumed once by the parser
#[derive(Debug, Clone)]
pub struct RawPage {
    /// 1-based page number
    pub page_number: u32,

    /// URL the markup was fetched from
    pub url: String,

    /// Response body
    pub markup: String,
}

/// One product extracted from a listing
///
/// Serialized with the field names the persisted product file has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "product_title")]
    pub title: String,

    #[serde(rename = "product_price")]
    pub price: f64,

    /// Local path of the downloaded image, if any
    #[serde(rename = "path_to_image")]
    pub asset_path: Option<String>,
}

/// Output of one scrape run
///
/// Records are ordered by page number, then by position on the page.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub records: Vec<Record>,
    pub report: ScrapeReport,
}
