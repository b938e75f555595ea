// src/pipeline.rs
use crate::dispatch::Dispatcher;
use crate::extraction::ExtractionBackend;
use crate::model::{RawExtraction, Record, ValidationReport};
use crate::utils::error::PipelineError;
use crate::validator::Validator;

/// Runs one document through extraction, classification, parsing and
/// scoring. The validator only ever sees a fully built record.
pub async fn process_document(
    backend: &dyn ExtractionBackend,
    dispatcher: &Dispatcher,
    validator: &Validator,
    bytes: &[u8],
    filename: &str,
) -> Result<(Record, ValidationReport), PipelineError> {
    tracing::debug!("Extracting {} with the {} backend ({} bytes)", filename, backend.name(), bytes.len());
    let raw = backend.extract(bytes).await?;
    tracing::debug!(
        "Extracted {} pages and {} tables from {} ({})",
        raw.pages.len(),
        raw.tables.len(),
        filename,
        raw.source_language.as_str()
    );

    process_extraction(dispatcher, validator, &raw, filename).await
}

/// Classification, parsing and scoring of an already extracted document.
pub async fn process_extraction(
    dispatcher: &Dispatcher,
    validator: &Validator,
    raw: &RawExtraction,
    filename: &str,
) -> Result<(Record, ValidationReport), PipelineError> {
    let record = dispatcher.classify_and_parse(raw, filename).await?;
    let report = validator.score(&record);
    tracing::debug!("Scored {} at {:.3}", record.document_id, report.score);
    Ok((record, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::dispatch::{DispatchPolicy, ParserRegistry};
    use crate::extraction::{JsonBackend, TextBackend};
    use crate::model::DocumentKind;
    use crate::translation::testing::EchoTranslator;
    use crate::translation::DisabledTranslator;
    use crate::translation::TranslationService;
    use crate::utils::error::{ExtractionError, ParseError};
    use crate::validator::TRANSLATION_COMPLETENESS;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct BrokenBackend;

    #[async_trait]
    impl ExtractionBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        async fn extract(&self, _document: &[u8]) -> Result<RawExtraction, ExtractionError> {
            Err(ExtractionError::Backend("corrupt xref table".to_string()))
        }
    }

    fn dispatcher(config: &PipelineConfig, translator: Arc<dyn TranslationService>) -> Dispatcher {
        let registry = Arc::new(ParserRegistry::from_config(config).unwrap());
        Dispatcher::new(registry, translator, DispatchPolicy::from_config(config))
    }

    const SURVEY_JSON: &str = r#"{
        "pages": ["2024年第三季度城镇储户问卷调查报告\n一、收入\n收入感受指数为49.3%。\n二、就业\n就业感受指数为45.9%。"],
        "tables": [{"page": 0, "rows": [["指标", "本季"], ["收入感受指数", "49.3"]]}],
        "source_language": "ZH"
    }"#;

    #[tokio::test]
    async fn translated_macro_report_scores_full_marks() {
        let config = PipelineConfig::default();
        let dispatcher = dispatcher(&config, Arc::new(EchoTranslator::default()));
        let validator = Validator::new(config.validator.clone());

        let (record, report) = process_document(
            &JsonBackend,
            &dispatcher,
            &validator,
            SURVEY_JSON.as_bytes(),
            "pboc_survey_2024q3.json",
        )
        .await
        .unwrap();

        assert_eq!(record.document_id, "pboc_survey_2024q3");
        assert_eq!(record.kind, DocumentKind::MacroEconomic);
        assert_eq!(record.sections.len(), 2);
        assert!(record.sections.iter().all(|s| s.body_translated.is_some()));
        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.metadata["report_period"], "2024年第三季度");
        assert!(record.extraction_warnings.is_empty());
        assert!((report.score - 1.0).abs() < 1e-9, "score was {}", report.score);
    }

    #[tokio::test]
    async fn offline_run_keeps_sections_and_loses_translation_credit() {
        let config = PipelineConfig::default();
        let dispatcher = dispatcher(&config, Arc::new(DisabledTranslator));
        let validator = Validator::new(config.validator.clone());

        let (record, report) = process_document(
            &JsonBackend,
            &dispatcher,
            &validator,
            SURVEY_JSON.as_bytes(),
            "survey.json",
        )
        .await
        .unwrap();

        assert_eq!(record.sections.len(), 2);
        assert!(record.sections.iter().all(|s| s.body_translated.is_none()));
        assert!(!record.extraction_warnings.is_empty());
        let check = report.check(TRANSLATION_COMPLETENESS).unwrap();
        assert_eq!(check.credit, 0.0);
        assert!(report.score < 0.7);
    }

    #[tokio::test]
    async fn extraction_failure_is_reported() {
        let config = PipelineConfig::default();
        let dispatcher = dispatcher(&config, Arc::new(DisabledTranslator));
        let err = process_document(&BrokenBackend, &dispatcher, &Validator::default(), b"%PDF", "x.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Backend(_))));
    }

    #[tokio::test]
    async fn parse_failure_is_reported_per_document() {
        let config = PipelineConfig::default();
        let dispatcher = dispatcher(&config, Arc::new(DisabledTranslator));
        let text = "一、价格\n消费价格上涨。";
        let err = process_document(&TextBackend, &dispatcher, &Validator::default(), text.as_bytes(), "cpi.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::MissingTitle { .. })));
    }

    #[test]
    fn blank_text_file_yields_generic_record() {
        let config = PipelineConfig::default();
        let dispatcher = dispatcher(&config, Arc::new(DisabledTranslator));
        let validator = Validator::default();
        let (record, report) = tokio_test::block_on(process_document(
            &TextBackend,
            &dispatcher,
            &validator,
            b"",
            "empty.txt",
        ))
        .unwrap();
        assert_eq!(record.kind, DocumentKind::Generic);
        assert!(record.sections.is_empty());
        assert!(report.score >= 0.0 && report.score <= 1.0);
    }
}
