// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::{Record, ValidationReport};
use crate::utils::error::StorageError;

/// On-disk form of one processed document.
#[derive(Serialize)]
struct StoredDocument<'a> {
    record: &'a Record,
    validation: &'a ValidationReport,
    processed_at: String,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory for auxiliary debug output of one document.
    pub fn debug_dir(&self, document_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir.join("debug").join(document_id);
        fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
        Ok(dir)
    }

    /// Saves a record and its validation report as
    /// `<base_dir>/<kind>/<document_id>.json`.
    pub fn save_document(
        &self,
        record: &Record,
        report: &ValidationReport,
    ) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(record.kind.as_str());
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }

        let file_path = target_dir.join(format!("{}.json", record.document_id));

        let document = StoredDocument {
            record,
            validation: report,
            processed_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved {} to {}", record.document_id, file_path.display());

        Ok(file_path)
    }
}
