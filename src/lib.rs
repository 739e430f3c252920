//! Shop-Scraper: a concurrent product-listing scraper
//!
//! This crate fetches a sequence of shop listing pages, extracts product
//! records from their markup, skips records whose price has not changed since
//! they were last seen, downloads product images, and hands the resulting
//! batch to a record store.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for a scrape run
///
/// Only conditions that make the whole run meaningless end up here. Failures
/// local to a page, an item or an image are recorded in the run report instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid scrape request: {0}")]
    InvalidRequest(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Dedup cache is unusable: {0}")]
    Cache(String),

    #[error("Cannot prepare assets directory {path}: {source}")]
    AssetsDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{Orchestrator, Record, ScrapeRequest, ScrapeResult};
pub use state::{DedupCache, PageOutcome};
