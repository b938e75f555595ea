// src/validator.rs
//! Quality scoring for parsed records.
//!
//! `Validator::score` is a pure function of the record: no I/O, no clock, no
//! counters. Every check contributes `weight * credit` to the score.

use crate::config::ValidatorConfig;
use crate::model::{CheckResult, Record, ValidationReport};

pub const HAS_TITLE: &str = "has_title";
pub const HAS_SECTIONS: &str = "has_sections";
pub const TRANSLATION_COMPLETENESS: &str = "translation_completeness";
pub const TABLE_EXTRACTION_PRESENCE: &str = "table_extraction_presence";
pub const NO_UNRESOLVED_WARNINGS: &str = "no_unresolved_warnings";
pub const METADATA_COMPLETENESS: &str = "metadata_completeness";

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, record: &Record) -> ValidationReport {
        let w = &self.config.weights;
        let checks = vec![
            Self::has_title(record, w.has_title),
            Self::has_sections(record, w.has_sections),
            Self::translation_completeness(record, w.translation_completeness),
            Self::table_extraction_presence(record, w.table_extraction_presence),
            Self::no_unresolved_warnings(record, w.no_unresolved_warnings),
            self.metadata_completeness(record, w.metadata_completeness),
        ];
        let score: f64 = checks.iter().map(|c| c.weight * c.credit).sum();
        ValidationReport {
            score: score.clamp(0.0, 1.0),
            checks,
        }
    }

    fn has_title(record: &Record, weight: f64) -> CheckResult {
        let passed = record
            .title
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        binary(HAS_TITLE, passed, weight, (!passed).then(|| "no title".to_string()))
    }

    fn has_sections(record: &Record, weight: f64) -> CheckResult {
        let passed = !record.sections.is_empty();
        binary(HAS_SECTIONS, passed, weight, (!passed).then(|| "no sections".to_string()))
    }

    /// Partial credit: translated / requiring translation.
    fn translation_completeness(record: &Record, weight: f64) -> CheckResult {
        let required: Vec<_> = record
            .sections
            .iter()
            .filter(|s| s.requires_translation())
            .collect();
        if required.is_empty() {
            return binary(TRANSLATION_COMPLETENESS, true, weight, None);
        }

        let translated = required
            .iter()
            .filter(|s| s.body_translated.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .count();
        let credit = translated as f64 / required.len() as f64;
        CheckResult {
            name: TRANSLATION_COMPLETENESS.to_string(),
            passed: translated == required.len(),
            weight,
            credit,
            detail: Some(format!("{}/{} sections translated", translated, required.len())),
        }
    }

    fn table_extraction_presence(record: &Record, weight: f64) -> CheckResult {
        let passed = record.raw_table_count == 0 || !record.tables.is_empty();
        let detail = (!passed).then(|| {
            format!("{} raw tables but none in the record", record.raw_table_count)
        });
        binary(TABLE_EXTRACTION_PRESENCE, passed, weight, detail)
    }

    fn no_unresolved_warnings(record: &Record, weight: f64) -> CheckResult {
        let count = record.extraction_warnings.len();
        let detail = (count > 0).then(|| format!("{} warnings", count));
        binary(NO_UNRESOLVED_WARNINGS, count == 0, weight, detail)
    }

    fn metadata_completeness(&self, record: &Record, weight: f64) -> CheckResult {
        let missing: Vec<&str> = self
            .config
            .required_metadata
            .get(&record.kind)
            .map(|keys| {
                keys.iter()
                    .filter(|k| {
                        record
                            .metadata
                            .get(k.as_str())
                            .map_or(true, |v| v.trim().is_empty())
                    })
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default();
        let detail = (!missing.is_empty()).then(|| format!("missing: {}", missing.join(", ")));
        binary(METADATA_COMPLETENESS, missing.is_empty(), weight, detail)
    }
}

fn binary(name: &str, passed: bool, weight: f64, detail: Option<String>) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed,
        weight,
        credit: if passed { 1.0 } else { 0.0 },
        detail,
    }
}
