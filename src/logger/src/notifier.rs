//! External hooks that receive every log event.

use crate::Level;

/// Receives every event emitted through a [`Logger`](crate::Logger),
/// independent of the configured threshold.
///
/// `trace` is empty unless the event came from [`Logger::error`](crate::Logger::error).
/// Implementations are called on the logging thread and should return quickly.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, trace: &[u8], message: &str);
}

/// Forwards logger events into the `tracing` ecosystem so that an installed
/// subscriber sees them alongside its own spans and events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: Level, trace: &[u8], message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "pipeflow", "{}", message),
            Level::Info => tracing::info!(target: "pipeflow", "{}", message),
            Level::Error if trace.is_empty() => {
                tracing::error!(target: "pipeflow", "{}", message)
            }
            Level::Error => {
                let trace = String::from_utf8_lossy(trace);
                tracing::error!(target: "pipeflow", trace = %trace, "{}", message)
            }
            Level::Status => tracing::info!(target: "pipeflow", status = true, "{}", message),
            Level::Silent => {}
        }
    }
}
