//! SQLite storage implementation
//!
//! Keeps every run with its records. The listing returns the records of the
//! most recent run.

use crate::pipeline::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::{
    to_indented_json, RecordStore, RunBatch, RunRecord, RunStatus, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite record store
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Most recently stored run
    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, pages_requested, pages_failed
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let status: String = row.get(4)?;
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&status)
                            .unwrap_or(RunStatus::Partial),
                        pages_requested: row.get(5)?,
                        pages_failed: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    /// Records of one run, in emission order
    pub fn load_records(&self, run_id: i64) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, price, image_path FROM products WHERE run_id = ?1 ORDER BY position",
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(Record {
                    title: row.get(0)?,
                    price: row.get(1)?,
                    asset_path: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl RecordStore for SqliteStore {
    fn persist(&mut self, batch: &RunBatch<'_>) -> StorageResult<()> {
        let report = batch.report;
        let finished_at = report.finished_at.unwrap_or_else(Utc::now);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (started_at, finished_at, config_hash, status, pages_requested, pages_failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                batch.config_hash,
                RunStatus::from_report(report).to_db_string(),
                report.pages_requested,
                report.pages_failed(),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (run_id, position, title, price, image_path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, record) in batch.records.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    record.title,
                    record.price,
                    record.asset_path,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Stored run {} with {} records in {}",
            run_id,
            batch.records.len(),
            self.location
        );
        Ok(())
    }

    fn listing(&self) -> StorageResult<String> {
        let run = self
            .get_latest_run()?
            .ok_or_else(|| StorageError::NotFound(self.location.clone()))?;
        let records = self.load_records(run.id)?;
        to_indented_json(&records)
    }
}
