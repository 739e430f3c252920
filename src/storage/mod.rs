//! Storage module for persisting scraped batches
//!
//! The scrape core hands each run's records to a `RecordStore` and is done
//! with them. Two stores exist:
//! - `JsonFileStore`: one indented JSON array per run, overwriting the previous one
//! - `SqliteStore`: every run and its records kept in a SQLite database
//!
//! Both also serve the listing read path, which returns the stored products
//! as JSON text.

mod json;
mod schema;
mod sqlite;

pub use json::{to_indented_json, JsonFileStore};
pub use schema::initialize_schema;
pub use sqlite::SqliteStore;

use crate::config::{OutputConfig, OutputFormat};
use crate::output::ScrapeReport;
use crate::pipeline::Record;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No stored products at {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One run's output as handed to a store
#[derive(Debug, Clone, Copy)]
pub struct RunBatch<'a> {
    pub records: &'a [Record],
    pub report: &'a ScrapeReport,
    pub config_hash: &'a str,
}

/// Trait for record store implementations
pub trait RecordStore {
    /// Persists the records of one run
    fn persist(&mut self, batch: &RunBatch<'_>) -> StorageResult<()>;

    /// Returns the stored products as JSON text
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The stored products
    /// * `Err(StorageError::NotFound)` - Nothing has been stored yet
    fn listing(&self) -> StorageResult<String>;
}

/// Opens the store selected by the output configuration
pub fn open_store(config: &OutputConfig) -> StorageResult<Box<dyn RecordStore>> {
    let path = Path::new(&config.path);
    Ok(match config.format {
        OutputFormat::Json => Box::new(JsonFileStore::new(path)),
        OutputFormat::Sqlite => Box::new(SqliteStore::new(path)?),
    })
}

/// Represents a stored scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_requested: u32,
    pub pages_failed: u32,
}

/// Status of a stored scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every page was fetched
    Completed,
    /// Some pages failed; the batch is best effort
    Partial,
}

impl RunStatus {
    /// Status for a finished run report
    pub fn from_report(report: &ScrapeReport) -> Self {
        if report.pages_failed() > 0 {
            Self::Partial
        } else {
            Self::Completed
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}
