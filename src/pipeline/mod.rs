//! Scrape pipeline: fetch → parse → dedup → image download → merge
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with fixed-delay retry
//! - Listing markup parsing tolerant of malformed items
//! - Streamed product image downloads
//! - Overall run orchestration and result merging

mod assets;
mod fetcher;
mod orchestrator;
mod parser;
mod types;

pub use assets::{AssetError, AssetFetcher};
pub use fetcher::{build_http_client, fetch_page, FetchError, RetryPolicy};
pub use orchestrator::{run_scrape, Orchestrator};
pub use parser::{parse_page, parse_price, Candidate, ParseFault, ParsedPage};
pub use types::{RawPage, Record, ScrapeRequest, ScrapeResult};
