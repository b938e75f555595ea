// src/extraction/text.rs
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::ExtractionBackend;
use crate::model::RawExtraction;
use crate::utils::error::ExtractionError;
use crate::utils::language::detect_language;

const PAGE_BREAK: char = '\u{000C}';

/// Builds a `RawExtraction` from text with form-feed page breaks, the layout
/// `pdftotext` and most text dumpers produce. No grids: tables in such text
/// are recovered later by the parsers.
pub fn raw_from_text(text: &str) -> RawExtraction {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(|p| p.to_string()).collect();
    // A trailing form feed leaves an empty last page behind.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    if pages.len() == 1 && pages[0].trim().is_empty() {
        pages.clear();
    }
    let source_language = detect_language(text);
    RawExtraction {
        pages,
        tables: Vec::new(),
        source_language,
    }
}

/// Plain UTF-8 text input.
pub struct TextBackend;

#[async_trait]
impl ExtractionBackend for TextBackend {
    fn name(&self) -> &str {
        "text"
    }

    async fn extract(&self, document: &[u8]) -> Result<RawExtraction, ExtractionError> {
        let text = std::str::from_utf8(document)
            .map_err(|e| ExtractionError::InvalidText(e.to_string()))?;
        Ok(raw_from_text(text))
    }
}

/// Shells out to poppler's `pdftotext -layout`, feeding the PDF on stdin.
pub struct PdftotextBackend {
    program: String,
}

impl Default for PdftotextBackend {
    fn default() -> Self {
        Self {
            program: "pdftotext".to_string(),
        }
    }
}

#[async_trait]
impl ExtractionBackend for PdftotextBackend {
    fn name(&self) -> &str {
        "pdftotext"
    }

    async fn extract(&self, document: &[u8]) -> Result<RawExtraction, ExtractionError> {
        let mut child = Command::new(&self.program)
            .args(["-layout", "-enc", "UTF-8", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractionError::Backend(format!("could not start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(document).await?;
            // Dropping stdin closes the pipe so pdftotext sees EOF.
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(ExtractionError::Backend(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| ExtractionError::InvalidText(e.to_string()))?;
        Ok(raw_from_text(&text))
    }
}
