//! Process bring-up for binaries embedding pipeflow.
//!
//! Loads the YAML config (or falls back to defaults), then sets up the
//! logger and, when requested, the tracing bridge.

use crate::config::AppConfig;
use crate::error::InitError;
use crate::logging::{init_logging, LoggingGuard};
use logger::Logger;
use std::path::Path;

/// Result of the default initialization process.
pub struct BootstrapResult {
    pub config: AppConfig,
    /// Handle to pass to every stage.
    pub logger: Logger,
    /// Must be kept alive for the lifetime of the application.
    pub logging_guard: LoggingGuard,
}

/// Load config from `config_path` if given, then initialize logging.
///
/// # Example
/// ```ignore
/// let init = pipeflow::bootstrap::default_init(Some(Path::new("pipeflow.yaml")))?;
/// let reader = IoReader::builder(file)
///     .config(init.config.reader.clone())
///     .logger(init.logger.clone())
///     .build()?;
/// ```
pub fn default_init(config_path: Option<&Path>) -> Result<BootstrapResult, InitError> {
    let config = match config_path {
        Some(path) => AppConfig::load_required(path)?,
        None => AppConfig::default(),
    };

    let logging_guard = init_logging(&config.logging)?;
    let logger = logging_guard.logger().clone();
    if let Some(path) = config_path {
        logger.status(format_args!("loaded config {}", path.display()));
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        line_by_line = config.reader.line_by_line,
        gzipped = config.reader.gzipped,
        "pipeflow initialized"
    );

    Ok(BootstrapResult {
        config,
        logger,
        logging_guard,
    })
}
