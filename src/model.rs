// src/model.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Language of a document or of one section of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    En,
    Zh,
    #[default]
    Unknown,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Zh => "ZH",
            Language::Unknown => "UNKNOWN",
        }
    }

    /// Code understood by LibreTranslate-style services.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Unknown => "auto",
        }
    }
}

/// The document family assigned by the dispatcher. Declaration order is the
/// classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    MacroEconomic,
    BulkDeal,
    BoardMeeting,
    ShareholdingPattern,
    Generic,
}

impl DocumentKind {
    pub const PRIORITY: [DocumentKind; 5] = [
        DocumentKind::MacroEconomic,
        DocumentKind::BulkDeal,
        DocumentKind::BoardMeeting,
        DocumentKind::ShareholdingPattern,
        DocumentKind::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::MacroEconomic => "macro_economic",
            DocumentKind::BulkDeal => "bulk_deal",
            DocumentKind::BoardMeeting => "board_meeting",
            DocumentKind::ShareholdingPattern => "shareholding_pattern",
            DocumentKind::Generic => "generic",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table grid as returned by an extraction backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Zero-based page the table was found on, when the backend knows it.
    #[serde(default)]
    pub page: Option<usize>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    #[cfg(test)]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { page: None, rows }
    }

    #[cfg(test)]
    pub fn on_page(page: usize, rows: Vec<Vec<String>>) -> Self {
        Self { page: Some(page), rows }
    }

    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }
}

/// Unprocessed backend output for a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub source_language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub heading_translated: Option<String>,
    pub body_original: String,
    pub body_translated: Option<String>,
    pub language: Language,
}

impl Section {
    pub fn new(heading: impl Into<String>, body: impl Into<String>, language: Language) -> Self {
        Self {
            heading: heading.into(),
            heading_translated: None,
            body_original: body.into(),
            body_translated: None,
            language,
        }
    }

    /// A section needs an English rendering when it has a Chinese body.
    /// Sections of digits and punctuation detect as `Unknown` and carry
    /// nothing to translate.
    pub fn requires_translation(&self) -> bool {
        self.language == Language::Zh && !self.body_original.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableSource {
    /// Grid handed over by the extraction backend.
    Grid,
    /// Reconstructed from whitespace-aligned page text.
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub caption: Option<String>,
    pub rows: Vec<Vec<String>>,
    pub translated_header: Option<Vec<String>>,
    pub translated: bool,
    pub source: TableSource,
}

impl Table {
    pub fn new(caption: Option<String>, rows: Vec<Vec<String>>, source: TableSource) -> Self {
        Self {
            caption,
            rows,
            translated_header: None,
            translated: false,
            source,
        }
    }
}

/// Normalized output of one parser run. Built once, never mutated by the
/// validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub document_id: String,
    pub kind: DocumentKind,
    pub source_language: Language,
    pub title: Option<String>,
    pub title_translated: Option<String>,
    pub sections: Vec<Section>,
    pub tables: Vec<Table>,
    /// Number of grids the backend produced; lets table loss be judged from
    /// the record alone.
    pub raw_table_count: usize,
    pub metadata: BTreeMap<String, String>,
    pub extraction_warnings: Vec<String>,
}

impl Record {
    pub fn new(document_id: impl Into<String>, kind: DocumentKind, raw: &RawExtraction) -> Self {
        Self {
            document_id: document_id.into(),
            kind,
            source_language: raw.source_language,
            title: None,
            title_translated: None,
            sections: Vec::new(),
            tables: Vec::new(),
            raw_table_count: raw.tables.len(),
            metadata: BTreeMap::new(),
            extraction_warnings: Vec::new(),
        }
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.metadata.insert(key.to_string(), value.trim().to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub weight: f64,
    /// Fraction of the weight earned, in [0, 1].
    pub credit: f64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub score: f64,
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}
