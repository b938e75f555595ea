// src/parsers/rule.rs
use regex::Regex;

use crate::config::RuleConfig;
use crate::model::{DocumentKind, RawExtraction};
use crate::utils::error::ConfigError;

/// The first few pages of a document, prepared for cheap keyword matching.
#[derive(Debug, Clone)]
pub struct HeaderWindow {
    pages: usize,
    text: String,
    lowered: String,
    blank_document: bool,
}

impl HeaderWindow {
    pub fn new(raw: &RawExtraction, pages: usize) -> Self {
        let text = raw
            .pages
            .iter()
            .take(pages)
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let lowered = text.to_lowercase();
        Self {
            pages,
            text,
            lowered,
            blank_document: raw.pages.is_empty() && raw.tables.is_empty(),
        }
    }

    /// True when the extraction produced neither pages nor tables.
    pub fn blank_document(&self) -> bool {
        self.blank_document
    }

    /// Configured window size, not the number of pages actually present.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Non-blank, trimmed lines in page order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    fn contains_lowered(&self, needle: &str) -> bool {
        self.lowered.contains(needle)
    }
}

/// Keyword and filename predicate for one document kind.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    keywords: Vec<String>,
    filename_patterns: Vec<Regex>,
}

impl ClassificationRule {
    pub fn from_config(kind: DocumentKind, config: &RuleConfig) -> Result<Self, ConfigError> {
        let keywords = config
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let filename_patterns = config
            .filename_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    kind,
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            keywords,
            filename_patterns,
        })
    }

    pub fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool {
        self.keywords.iter().any(|k| header.contains_lowered(k))
            || self.filename_patterns.iter().any(|re| re.is_match(filename_hint))
    }

    /// Every keyword and filename pattern that fired, for logs and debug output.
    pub fn hits(&self, header: &HeaderWindow, filename_hint: &str) -> Vec<String> {
        let mut hits: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| header.contains_lowered(k))
            .cloned()
            .collect();
        hits.extend(
            self.filename_patterns
                .iter()
                .filter(|re| re.is_match(filename_hint))
                .map(|re| format!("filename:{}", re.as_str())),
        );
        hits
    }
}
