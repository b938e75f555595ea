// src/main.rs
mod config;
mod dispatch;
mod extraction;
mod model;
mod parsers;
mod pipeline;
mod storage;
mod translation;
mod utils;
mod validator;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use config::PipelineConfig;
use dispatch::{DispatchPolicy, Dispatcher, ParserRegistry};
use extraction::backend_for_path;
use model::{DocumentKind, RawExtraction};
use storage::StorageManager;
use translation::{DisabledTranslator, HttpTranslator, TranslationService};
use utils::error::{ConfigError, PipelineError};
use utils::AppError;
use validator::Validator;

/// Classifies financial filings, extracts them into structured JSON and
/// scores the result
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input documents (.pdf, .txt or pre-extracted .json) or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for records and validation reports
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// JSON configuration file (keywords, weights, translation settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of leading pages used for classification
    #[arg(long)]
    header_pages: Option<usize>,

    /// Fall back to generic extraction when the selected parser fails
    #[arg(long)]
    best_effort: bool,

    /// Base URL of a LibreTranslate-compatible translation service
    #[arg(long)]
    translate_endpoint: Option<String>,

    /// API key for the translation service
    #[arg(long)]
    translate_api_key: Option<String>,

    /// Timeout for a single translation call
    #[arg(long)]
    translation_timeout_ms: Option<u64>,

    /// Fail a document when a required translation is unavailable
    #[arg(long)]
    strict_translation: bool,

    /// Maximum number of documents processed concurrently
    #[arg(short, long, default_value_t = 4)]
    jobs: usize,

    /// Documents scoring below this are reported as low quality
    #[arg(long, default_value_t = 0.6)]
    min_score: f64,

    /// Debug mode - save annotated header windows showing classification hits
    #[arg(short, long)]
    debug: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Applies command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(pages) = self.header_pages {
            config.header_window_pages = pages;
        }
        if self.best_effort {
            config.best_effort = true;
        }
        if let Some(endpoint) = &self.translate_endpoint {
            config.translation.endpoint = Some(endpoint.clone());
        }
        if let Some(key) = &self.translate_api_key {
            config.translation.api_key = Some(key.clone());
        }
        if let Some(timeout) = self.translation_timeout_ms {
            config.translation.timeout_ms = timeout;
        }
        if self.strict_translation {
            config.translation.strict = true;
        }
    }
}

/// Shared, read-only state of one run.
struct RunContext {
    dispatcher: Dispatcher,
    validator: Validator,
    storage: StorageManager,
    debug: bool,
}

struct Processed {
    document_id: String,
    kind: DocumentKind,
    score: f64,
    warnings: usize,
    saved: PathBuf,
}

fn collect_dir(dir: &Path, exclude: Option<&Path>, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if exclude.is_some() && path.canonicalize().ok().as_deref() == exclude {
                continue;
            }
            collect_dir(&path, exclude, files)?;
        } else if backend_for_path(&path).is_ok() {
            files.push(path);
        }
    }
    Ok(())
}

/// Expands directories into the supported documents they contain. The
/// output directory is never descended into.
fn collect_inputs(inputs: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let exclude = output_dir.canonicalize().ok();
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_dir(input, exclude.as_deref(), &mut files)?;
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            tracing::warn!("Skipping {}: not a file or directory", input.display());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn write_debug_output(ctx: &RunContext, raw: &RawExtraction, filename: &str) {
    let registry = ctx.dispatcher.registry();
    let header = registry.header_window(raw);
    let classification = registry.classify(&header, filename);
    let document_id = dispatch::document_id(filename, raw);

    let debug_dir = match ctx.storage.debug_dir(&document_id) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!("Failed to create debug directory for {}: {}", document_id, e);
            return;
        }
    };
    let html_path = debug_dir.join("header_annotated.html");
    if let Err(e) = utils::html_debug::write_classification_debug(header.text(), &classification, &html_path) {
        tracing::warn!("Failed to create debug HTML: {}", e);
    } else {
        tracing::info!("Created annotated debug HTML: {}", html_path.display());
    }
}

async fn process_path(ctx: &RunContext, path: &Path, filename: &str) -> Result<Processed, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let backend = backend_for_path(path).map_err(PipelineError::from)?;
    tracing::info!("Processing {} ({} bytes, {} backend)", path.display(), bytes.len(), backend.name());

    let (record, report) = if ctx.debug {
        let raw = backend.extract(&bytes).await.map_err(PipelineError::from)?;
        write_debug_output(ctx, &raw, filename);
        pipeline::process_extraction(&ctx.dispatcher, &ctx.validator, &raw, filename).await?
    } else {
        pipeline::process_document(backend.as_ref(), &ctx.dispatcher, &ctx.validator, &bytes, filename)
            .await?
    };

    let saved = ctx.storage.save_document(&record, &report)?;
    Ok(Processed {
        document_id: record.document_id,
        kind: record.kind,
        score: report.score,
        warnings: record.extraction_warnings.len(),
        saved,
    })
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI arguments and set up logging (reads RUST_LOG)
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);
    tracing::info!(
        "Starting run: {} input path(s), output {}, {} job(s)",
        args.inputs.len(),
        args.output_dir,
        args.jobs
    );

    // 2. Load configuration, then apply flag overrides
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    if !(0.0..=1.0).contains(&args.min_score) {
        return Err(ConfigError::Invalid(format!("--min-score must be within [0, 1], got {}", args.min_score)).into());
    }

    // 3. Build the parser registry and translation backend
    let registry = Arc::new(ParserRegistry::from_config(&config)?);
    tracing::debug!(
        "Parser priority: {}",
        registry.kinds().iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" > ")
    );
    let translator: Arc<dyn TranslationService> = match &config.translation.endpoint {
        Some(endpoint) => {
            tracing::info!("Translating through {}", endpoint);
            Arc::new(HttpTranslator::new(endpoint, config.translation.api_key.clone())?)
        }
        None => {
            tracing::warn!("No translation endpoint configured; non-English sections will stay untranslated");
            Arc::new(DisabledTranslator)
        }
    };

    // 4. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;

    // 5. Collect input documents
    let files = collect_inputs(&args.inputs, storage.base_dir())?;
    if files.is_empty() {
        return Err(AppError::Processing("No supported input documents found".to_string()));
    }
    tracing::info!("Found {} document(s) to process", files.len());

    let ctx = Arc::new(RunContext {
        dispatcher: Dispatcher::new(registry, translator, DispatchPolicy::from_config(&config)),
        validator: Validator::new(config.validator.clone()),
        storage,
        debug: args.debug,
    });

    // 6. Process documents concurrently, bounded by --jobs
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();
    let hints = dispatch::filename_hints(&files);
    for (path, filename) in files.into_iter().zip(hints) {
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => process_path(&ctx, &path, &filename).await,
                Err(e) => Err(AppError::Processing(format!("Worker pool closed: {}", e))),
            };
            (path, result)
        });
    }

    let mut success_count = 0;
    let mut failure_count = 0;
    let mut low_quality_count = 0;

    while let Some(joined) = tasks.join_next().await {
        let (path, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Worker task failed: {}", e);
                failure_count += 1;
                continue;
            }
        };

        match result {
            Ok(processed) => {
                success_count += 1;
                tracing::info!(
                    "{} -> {} [{}], score {:.3}, {} warning(s), saved to {}",
                    path.display(),
                    processed.document_id,
                    processed.kind,
                    processed.score,
                    processed.warnings,
                    processed.saved.display()
                );
                if processed.score < args.min_score {
                    low_quality_count += 1;
                    tracing::warn!(
                        "Low quality extraction for {}: score {:.3} is below {:.2}",
                        processed.document_id,
                        processed.score,
                        args.min_score
                    );
                }
            }
            Err(e) => {
                failure_count += 1;
                tracing::error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!(
        "Processing finished. Success: {}, Failures: {}, Low quality: {}",
        success_count,
        failure_count,
        low_quality_count
    );

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to process any of {} document(s)",
            failure_count
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_configuration() {
        let args = Args::parse_from([
            "filing_extractor",
            "in",
            "--header-pages",
            "3",
            "--best-effort",
            "--translate-endpoint",
            "http://localhost:5000",
            "--translation-timeout-ms",
            "2500",
        ]);
        let mut config = PipelineConfig::default();
        args.apply(&mut config);
        assert_eq!(config.header_window_pages, 3);
        assert!(config.best_effort);
        assert_eq!(config.translation.endpoint.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.translation.timeout_ms, 2500);
        assert!(!config.translation.strict);
    }

    #[test]
    fn directories_expand_to_supported_documents() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = dir.path().join("in");
        let output = inputs.join("out");
        std::fs::create_dir_all(inputs.join("nested")).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(inputs.join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(inputs.join("nested").join("b.txt"), b"memo").unwrap();
        std::fs::write(inputs.join("notes.xlsx"), b"").unwrap();
        std::fs::write(output.join("old.json"), b"{}").unwrap();

        let files = collect_inputs(&[inputs.clone()], &output).unwrap();
        assert_eq!(files, vec![inputs.join("a.pdf"), inputs.join("nested").join("b.txt")]);
    }

    #[test]
    fn same_named_files_in_different_directories_keep_separate_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for quarter in ["q1", "q2"] {
            std::fs::create_dir_all(dir.path().join(quarter)).unwrap();
            std::fs::write(dir.path().join(quarter).join("report.txt"), b"memo").unwrap();
        }
        let files = collect_inputs(&[dir.path().to_path_buf()], &dir.path().join("out")).unwrap();
        assert_eq!(files.len(), 2);

        let raw = RawExtraction::default();
        let ids: Vec<String> = dispatch::filename_hints(&files)
            .iter()
            .map(|hint| dispatch::document_id(hint, &raw))
            .collect();
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|id| id.starts_with("report-")));
    }
}
