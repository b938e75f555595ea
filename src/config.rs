// src/config.rs
//! Run configuration. Everything the dispatcher and validator need to tune is
//! data here, loaded from an optional JSON file and then overridden by CLI
//! flags in `main`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::model::DocumentKind;
use crate::utils::error::ConfigError;

const DEFAULT_HEADER_WINDOW_PAGES: usize = 2;
const DEFAULT_TRANSLATION_TIMEOUT_MS: u64 = 15_000;
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of leading pages inspected for classification and titles.
    pub header_window_pages: usize,
    /// Re-dispatch to the generic parser when the selected parser fails.
    pub best_effort: bool,
    pub classification: ClassificationConfig,
    pub validator: ValidatorConfig,
    pub translation: TranslationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_window_pages: DEFAULT_HEADER_WINDOW_PAGES,
            best_effort: false,
            classification: ClassificationConfig::default(),
            validator: ValidatorConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header_window_pages == 0 {
            return Err(ConfigError::Invalid(
                "header_window_pages must be at least 1".to_string(),
            ));
        }
        self.validator.weights.validate()
    }
}

/// Keyword and filename rules for one document kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Case-insensitive substrings searched in the header window.
    pub keywords: Vec<String>,
    /// Regular expressions tried against the filename hint.
    pub filename_patterns: Vec<String>,
}

impl RuleConfig {
    fn new(keywords: &[&str], filename_patterns: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            filename_patterns: filename_patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub macro_economic: RuleConfig,
    pub bulk_deal: RuleConfig,
    pub board_meeting: RuleConfig,
    pub shareholding_pattern: RuleConfig,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            macro_economic: RuleConfig::new(
                &[
                    "宏观经济",
                    "中国人民银行",
                    "景气指数",
                    "价格指数",
                    "预期指数",
                    "城镇居民",
                    "消费",
                    "价格",
                    "就业",
                    "收入",
                    "macroeconomic",
                    "macro-economic",
                    "monetary policy report",
                ],
                &[r"(?i)macro", r"(?i)pboc"],
            ),
            // "trading" and "securities" are left out: SEBI notices of every
            // kind mention them.
            bulk_deal: RuleConfig::new(
                &[
                    "bulk deal",
                    "bulk transaction",
                    "block deal",
                    "shares acquired",
                    "acquirer",
                    "date of transaction",
                ],
                &[r"(?i)bulk[_\-\s]?deal", r"(?i)block[_\-\s]?deal"],
            ),
            board_meeting: RuleConfig::new(
                &[
                    "board meeting",
                    "meeting of the board",
                    "agenda",
                    "resolution",
                    "meeting held on",
                    "minutes of meeting",
                ],
                &[r"(?i)board[_\-\s]?meeting", r"(?i)outcome"],
            ),
            shareholding_pattern: RuleConfig::new(
                &[
                    "shareholding pattern",
                    "shareholding",
                    "shareholders",
                    "category",
                    "percentage",
                    "promoter",
                    "public",
                    "fiis",
                ],
                &[r"(?i)shareholding", r"(?i)\bshp\b"],
            ),
        }
    }
}

impl ClassificationConfig {
    pub fn rule(&self, kind: DocumentKind) -> Option<&RuleConfig> {
        match kind {
            DocumentKind::MacroEconomic => Some(&self.macro_economic),
            DocumentKind::BulkDeal => Some(&self.bulk_deal),
            DocumentKind::BoardMeeting => Some(&self.board_meeting),
            DocumentKind::ShareholdingPattern => Some(&self.shareholding_pattern),
            DocumentKind::Generic => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckWeights {
    pub has_title: f64,
    pub has_sections: f64,
    pub translation_completeness: f64,
    pub table_extraction_presence: f64,
    pub no_unresolved_warnings: f64,
    pub metadata_completeness: f64,
}

impl Default for CheckWeights {
    fn default() -> Self {
        Self {
            has_title: 0.15,
            has_sections: 0.20,
            translation_completeness: 0.25,
            table_extraction_presence: 0.15,
            no_unresolved_warnings: 0.10,
            metadata_completeness: 0.15,
        }
    }
}

impl CheckWeights {
    fn all(&self) -> [f64; 6] {
        [
            self.has_title,
            self.has_sections,
            self.translation_completeness,
            self.table_extraction_presence,
            self.no_unresolved_warnings,
            self.metadata_completeness,
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.all();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Weights(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::Weights(format!(
                "weights must sum to 1.0, got {:.6}",
                sum
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub weights: CheckWeights,
    /// Metadata keys that must be present and non-empty, per kind.
    pub required_metadata: BTreeMap<DocumentKind, Vec<String>>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let keys = |ks: &[&str]| ks.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        let mut required_metadata = BTreeMap::new();
        required_metadata.insert(
            DocumentKind::MacroEconomic,
            keys(&["source_language", "report_period"]),
        );
        required_metadata.insert(DocumentKind::BulkDeal, keys(&["company_name", "deal_date"]));
        required_metadata.insert(
            DocumentKind::BoardMeeting,
            keys(&["company_name", "meeting_date"]),
        );
        required_metadata.insert(
            DocumentKind::ShareholdingPattern,
            keys(&["company_name", "quarter"]),
        );
        required_metadata.insert(DocumentKind::Generic, Vec::new());
        Self {
            weights: CheckWeights::default(),
            required_metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Base URL of a LibreTranslate-compatible service. No endpoint means
    /// translation is disabled and every attempt is recorded as a warning.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// Treat an unavailable translation as a parse failure instead of a warning.
    pub strict: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_ms: DEFAULT_TRANSLATION_TIMEOUT_MS,
            strict: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.header_window_pages, 2);
        assert!(!config.best_effort);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut weights = CheckWeights::default();
        weights.has_title = 0.5;
        assert!(matches!(weights.validate(), Err(ConfigError::Weights(_))));
    }

    #[test]
    fn rejects_negative_weight() {
        let mut weights = CheckWeights::default();
        weights.has_title = -0.15;
        weights.has_sections = 0.50;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "best_effort": true,
            "validator": { "weights": { "has_title": 0.25, "no_unresolved_warnings": 0.0 } },
            "classification": { "bulk_deal": { "keywords": ["deal sheet"] } }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!(config.best_effort);
        assert_eq!(config.header_window_pages, 2);
        assert!(config.validate().is_ok());
        assert_eq!(config.classification.bulk_deal.keywords, vec!["deal sheet"]);
        assert!(config.classification.bulk_deal.filename_patterns.is_empty());
        assert!(!config.classification.macro_economic.keywords.is_empty());
        assert_eq!(
            config.validator.required_metadata[&DocumentKind::BoardMeeting],
            vec!["company_name", "meeting_date"]
        );
    }

    #[test]
    fn zero_header_window_is_rejected() {
        let config = PipelineConfig {
            header_window_pages: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
