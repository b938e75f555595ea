// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins when set; otherwise the
/// crate logs at `info`, or at `debug` with `verbose`.
pub fn setup_logging(verbose: bool) {
    let default_directive = if verbose {
        "filing_extractor=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("Logging initialized ({})", default_directive);
}
