// src/dispatch.rs
//! Classification and parser dispatch.
//!
//! The registry is built once from configuration and only read afterwards,
//! so one `Arc<ParserRegistry>` serves every worker.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::model::{DocumentKind, RawExtraction, Record};
use crate::parsers::{
    BoardMeetingParser, BulkDealParser, ClassificationRule, GenericParser, HeaderWindow,
    MacroEconomicParser, ParseContext, Parser, ShareholdingPatternParser,
};
use crate::translation::{TranslationService, TranslationSession};
use crate::utils::error::{ConfigError, ParseError};

/// Outcome of classification: the kind and the evidence for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: DocumentKind,
    pub hits: Vec<String>,
}

/// Ordered parser table. The generic parser is always last and matches
/// everything, so every document finds a parser.
pub struct ParserRegistry {
    parsers: Vec<Parser>,
    header_window_pages: usize,
}

impl ParserRegistry {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let rules = &config.classification;
        let rule = |kind: DocumentKind| -> Result<ClassificationRule, ConfigError> {
            let rule_config = rules.rule(kind).cloned().unwrap_or_default();
            ClassificationRule::from_config(kind, &rule_config)
        };

        let mut parsers = Vec::with_capacity(DocumentKind::PRIORITY.len());
        for kind in DocumentKind::PRIORITY {
            let parser = match kind {
                DocumentKind::MacroEconomic => Parser::MacroEconomic(MacroEconomicParser::new(rule(kind)?)),
                DocumentKind::BulkDeal => Parser::BulkDeal(BulkDealParser::new(rule(kind)?)),
                DocumentKind::BoardMeeting => Parser::BoardMeeting(BoardMeetingParser::new(rule(kind)?)),
                DocumentKind::ShareholdingPattern => {
                    Parser::ShareholdingPattern(ShareholdingPatternParser::new(rule(kind)?))
                }
                DocumentKind::Generic => Parser::Generic(GenericParser),
            };
            parsers.push(parser);
        }
        Ok(Self::new(parsers, config.header_window_pages))
    }

    /// Builds a registry from an explicit parser list, kept in the given
    /// order. The generic parser always ends up last, exactly once.
    pub fn new(mut parsers: Vec<Parser>, header_window_pages: usize) -> Self {
        parsers.retain(|p| p.kind() != DocumentKind::Generic);
        parsers.push(Parser::Generic(GenericParser));
        Self {
            parsers,
            header_window_pages: header_window_pages.max(1),
        }
    }

    pub fn header_window(&self, raw: &RawExtraction) -> HeaderWindow {
        HeaderWindow::new(raw, self.header_window_pages)
    }

    /// First parser in priority order whose predicate accepts the document.
    /// An extraction with no pages and no tables always goes to generic,
    /// whatever its filename says.
    fn select(&self, header: &HeaderWindow, filename_hint: &str) -> &Parser {
        if header.blank_document() {
            return self.generic();
        }
        self.parsers
            .iter()
            .find(|p| p.as_dyn().matches(header, filename_hint))
            .unwrap_or_else(|| self.generic())
    }

    fn generic(&self) -> &Parser {
        // `new` guarantees the generic parser is the last entry.
        &self.parsers[self.parsers.len() - 1]
    }

    pub fn classify(&self, header: &HeaderWindow, filename_hint: &str) -> Classification {
        let parser = self.select(header, filename_hint);
        let hits = parser
            .rule()
            .map(|r| r.hits(header, filename_hint))
            .unwrap_or_default();
        Classification {
            kind: parser.kind(),
            hits,
        }
    }

    pub fn kinds(&self) -> Vec<DocumentKind> {
        self.parsers.iter().map(Parser::kind).collect()
    }
}

/// Stable identifier for a document: the sanitized filename stem, or a
/// content hash when no filename is known.
pub fn document_id(filename_hint: &str, raw: &RawExtraction) -> String {
    if let Some(stem) = sanitized_stem(filename_hint) {
        return stem;
    }

    let mut hasher = Sha256::new();
    for page in &raw.pages {
        hasher.update(page.as_bytes());
        hasher.update([0x0c]);
    }
    for table in &raw.tables {
        for row in &table.rows {
            hasher.update(row.join("\t").as_bytes());
            hasher.update(b"\n");
        }
    }
    format!("doc-{}", hex_prefix(&hasher.finalize(), 8))
}

fn sanitized_stem(filename: &str) -> Option<String> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .trim();
    (!stem.is_empty()).then(|| {
        stem.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    })
}

fn hex_prefix(digest: &[u8], bytes: usize) -> String {
    digest.iter().take(bytes).map(|b| format!("{:02x}", b)).collect()
}

/// Filename hints for one run, aligned with `paths`. Files whose names would
/// give the same document id get a hash of their full path appended to the
/// stem, so no two outputs of a run share a path.
pub fn filename_hints(paths: &[PathBuf]) -> Vec<String> {
    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
        .collect();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in &names {
        if let Some(stem) = sanitized_stem(name) {
            *seen.entry(stem).or_default() += 1;
        }
    }

    paths
        .iter()
        .zip(names)
        .map(|(path, name)| match sanitized_stem(&name) {
            Some(stem) if seen.get(&stem).copied().unwrap_or_default() > 1 => {
                let suffix = hex_prefix(&Sha256::digest(path.to_string_lossy().as_bytes()), 4);
                tracing::debug!("{} shares its id with another input; using {}-{}", path.display(), stem, suffix);
                match Path::new(&name).extension().and_then(|e| e.to_str()) {
                    Some(ext) => format!("{}-{}.{}", stem, suffix, ext),
                    None => format!("{}-{}", stem, suffix),
                }
            }
            _ => name,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Re-dispatch to the generic parser after a specific parser fails.
    pub best_effort: bool,
    pub strict_translation: bool,
    pub translation_timeout: Duration,
}

impl DispatchPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            best_effort: config.best_effort,
            strict_translation: config.translation.strict,
            translation_timeout: Duration::from_millis(config.translation.timeout_ms),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<ParserRegistry>,
    translator: Arc<dyn TranslationService>,
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ParserRegistry>,
        translator: Arc<dyn TranslationService>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            registry,
            translator,
            policy,
        }
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Classifies the document, runs the selected parser and returns its
    /// record. A parser failure is returned as is unless best-effort mode is
    /// on, in which case the generic parser produces the record instead.
    pub async fn classify_and_parse(
        &self,
        raw: &RawExtraction,
        filename_hint: &str,
    ) -> Result<Record, ParseError> {
        let header = self.registry.header_window(raw);
        let parser = self.registry.select(&header, filename_hint);
        let kind = parser.kind();
        let document_id = document_id(filename_hint, raw);

        if let Some(rule) = parser.rule() {
            tracing::info!(
                "Classified {} as {} (matched: {})",
                document_id,
                kind,
                rule.hits(&header, filename_hint).join(", ")
            );
        } else {
            tracing::info!("Classified {} as {} (no specific rule matched)", document_id, kind);
        }

        let mut ctx = ParseContext {
            document_id: document_id.clone(),
            header,
            translation: TranslationSession::new(self.translator.clone(), self.policy.translation_timeout),
            strict_translation: self.policy.strict_translation,
        };

        match parser.as_dyn().parse(raw, &mut ctx).await {
            Ok(record) => Ok(record),
            Err(e) if self.policy.best_effort && kind != DocumentKind::Generic => {
                tracing::warn!("{} parser failed for {}: {}; falling back to generic", kind, document_id, e);
                let Parser::Generic(generic) = self.registry.generic() else {
                    return Err(e);
                };
                let mut record = generic.build(raw, &document_id, &ctx.header);
                record.set_meta("classified_as", kind.as_str());
                record
                    .extraction_warnings
                    .insert(0, format!("{} parser failed ({}); used generic extraction", kind, e));
                Ok(record)
            }
            Err(e) => {
                tracing::error!("{} parser failed for {}: {}", kind, document_id, e);
                Err(e)
            }
        }
    }
}
