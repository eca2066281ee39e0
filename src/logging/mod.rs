use crate::config::LoggingConfig;
use crate::error::InitError;
use logger::{Logger, LoggerError, TracingNotifier};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;

/// Configure a fresh [`Logger`]: threshold, caller prefix and optional log file.
pub fn build_logger(cfg: &LoggingConfig) -> Result<Logger, LoggerError> {
    let logger = Logger::new();
    logger.set_level(cfg.level);
    logger.set_caller_prefix(cfg.caller_prefix);
    if let Some(path) = cfg.file.as_deref() {
        logger.set_logfile(path)?;
    }
    Ok(logger)
}

/// Keeps the configured logger alive; dropping it detaches the tracing bridge.
#[derive(Debug)]
pub struct LoggingGuard {
    logger: Logger,
}

impl LoggingGuard {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        self.logger.clear_notifier();
    }
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, InitError> {
    let logger = build_logger(cfg)?;

    if cfg.forward_to_tracing {
        let level = LevelFilter::from_str(&cfg.tracing_level)
            .map_err(|_| InitError::TracingLevel(cfg.tracing_level.clone()))?;
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        logger.set_notifier(Arc::new(TracingNotifier));
    }

    Ok(LoggingGuard { logger })
}
