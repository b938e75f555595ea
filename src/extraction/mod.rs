// src/extraction/mod.rs
//! Extraction backends turn document bytes into a [`RawExtraction`].
//!
//! Text layout and table geometry are the backend's business; the parsers
//! only ever see page strings and cell grids.

pub mod json;
pub mod text;

use async_trait::async_trait;
use std::path::Path;

use crate::model::RawExtraction;
use crate::utils::error::ExtractionError;

pub use json::JsonBackend;
pub use text::{PdftotextBackend, TextBackend};

/// Produces raw page text and table grids for one document.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn extract(&self, document: &[u8]) -> Result<RawExtraction, ExtractionError>;
}

/// Picks a backend from the file extension.
pub fn backend_for_path(path: &Path) -> Result<Box<dyn ExtractionBackend>, ExtractionError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(Box::new(JsonBackend)),
        "txt" => Ok(Box::new(TextBackend)),
        "pdf" => Ok(Box::new(PdftotextBackend::default())),
        other => Err(ExtractionError::UnsupportedFormat(if other.is_empty() {
            path.display().to_string()
        } else {
            format!(".{}", other)
        })),
    }
}
