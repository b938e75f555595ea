// src/utils/error.rs
use thiserror::Error;

use crate::model::DocumentKind;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error while reading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Document is not valid UTF-8 text: {0}")]
    InvalidText(String),

    #[error("Failed to decode pre-extracted JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Extraction backend failed: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Translation service rate limit exceeded")]
    RateLimited,

    #[error("Translation timed out after {0} ms")]
    Timeout(u64),

    #[error("Translation service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed translation response: {0}")]
    Response(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No title-like heading found in the first {pages} page(s)")]
    MissingTitle { pages: usize },

    #[error("Malformed table #{table}: {detail}")]
    MalformedTable { table: usize, detail: String },

    #[error("Translation unavailable for section '{heading}': {reason}")]
    TranslationUnavailable { heading: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid filename pattern '{pattern}' for {kind}: {source}")]
    Pattern {
        kind: DocumentKind,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid validator weights: {0}")]
    Weights(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Failure of one document's trip through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Translation client setup failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
