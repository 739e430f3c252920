//! JSON file store
//!
//! Each run overwrites the file with the run's records as an indented JSON
//! array. Runs that emit no records still write `[]`.

use crate::pipeline::Record;
use crate::storage::{RecordStore, RunBatch, StorageError, StorageResult};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};

/// Serializes records as a JSON array indented by four spaces
pub fn to_indented_json(records: &[Record]) -> StorageResult<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Store writing one JSON file per run
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn persist(&mut self, batch: &RunBatch<'_>) -> StorageResult<()> {
        let json = to_indented_json(batch.records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;

        tracing::info!(
            "Wrote {} records to {}",
            batch.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn listing(&self) -> StorageResult<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(
                self.path.display().to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
