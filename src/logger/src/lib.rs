//! Leveled logging for pipeline components.
//!
//! - Five ordered severities, `Debug < Info < Error < Status < Silent`
//! - Optional `file:line:` prefix captured from the call site
//! - Output to any `Write` sink, or stdout mirrored into an append-only file
//! - A [`Notifier`] hook that sees every event regardless of the threshold

mod error;
mod level;
mod logger;
mod notifier;

pub use error::LoggerError;
pub use level::{CallerPrefix, Level, ParseLevelError};
pub use logger::{default_logger, Logger, TRACE_BUFFER_SIZE};
pub use notifier::{Notifier, TracingNotifier};
