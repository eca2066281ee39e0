use std::io;
use std::path::PathBuf;

/// Errors surfaced by logger configuration calls.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    /// The requested log file could not be opened for appending.
    #[error("failed to open log file {}: {source}", .path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
