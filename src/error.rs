use crate::config::ConfigError;
use logger::LoggerError;

/// Failure while bringing up the process-wide configuration and logging.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
    #[error("invalid tracing level `{0}`")]
    TracingLevel(String),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
