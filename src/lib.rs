// Main library entry point
// The actual functionality is provided by individual crates:
// - logger: leveled logger with an optional event notifier
// - flow: payloads, abort signal, stage driver and the stream reader

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;

pub use bootstrap::{default_init, BootstrapResult};
pub use config::{AppConfig, ConfigError, LoggingConfig};
pub use error::InitError;
pub use flow;
pub use logger;
pub use logging::{build_logger, init_logging, LoggingGuard};
