// src/extraction/json.rs
use async_trait::async_trait;

use super::ExtractionBackend;
use crate::model::{Language, RawExtraction};
use crate::utils::error::ExtractionError;
use crate::utils::language::detect_language;

/// Reads output of an upstream extractor that was already serialized as a
/// `RawExtraction` JSON document.
pub struct JsonBackend;

#[async_trait]
impl ExtractionBackend for JsonBackend {
    fn name(&self) -> &str {
        "json"
    }

    async fn extract(&self, document: &[u8]) -> Result<RawExtraction, ExtractionError> {
        let mut raw: RawExtraction = serde_json::from_slice(document)?;
        if raw.source_language == Language::Unknown {
            raw.source_language = detect_language(&raw.pages.join("\n"));
        }
        tracing::debug!(
            "Decoded pre-extracted document: {} pages, {} tables, language {:?}",
            raw.pages.len(),
            raw.tables.len(),
            raw.source_language
        );
        Ok(raw)
    }
}
