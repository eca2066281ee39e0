use crate::{CallerPrefix, Level, LoggerError, Notifier};
use parking_lot::{Mutex, RwLock};
use std::backtrace::Backtrace;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::panic::Location;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Upper bound for the stack trace handed to the notifier by [`Logger::error`].
pub const TRACE_BUFFER_SIZE: usize = 4096;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");

/// Leveled diagnostic logger shared by every pipeline component.
///
/// Cloning is cheap and yields a handle onto the same configuration, so a
/// host can hand one logger to every stage and reconfigure it at runtime.
/// All reads and writes of the configuration are safe from any thread.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    threshold: AtomicU8,
    caller_prefix: AtomicU8,
    output: Mutex<Box<dyn Write + Send>>,
    notifier: RwLock<Option<Arc<dyn Notifier>>>,
}

impl Logger {
    /// Threshold `Info`, no caller prefix, output to stdout, no notifier.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    pub fn with_output(output: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                threshold: AtomicU8::new(Level::Info as u8),
                caller_prefix: AtomicU8::new(CallerPrefix::Off as u8),
                output: Mutex::new(Box::new(output)),
                notifier: RwLock::new(None),
            }),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.inner.threshold.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.inner.threshold.store(level as u8, Ordering::Relaxed);
    }

    pub fn caller_prefix(&self) -> CallerPrefix {
        CallerPrefix::from_u8(self.inner.caller_prefix.load(Ordering::Relaxed))
    }

    pub fn set_caller_prefix(&self, prefix: CallerPrefix) {
        self.inner
            .caller_prefix
            .store(prefix as u8, Ordering::Relaxed);
    }

    /// Redirect output to an arbitrary sink.
    pub fn set_output(&self, output: impl Write + Send + 'static) {
        *self.inner.output.lock() = Box::new(output);
    }

    /// Log to stdout and append to `path` as well.
    ///
    /// The file is opened with create+append and stays open for as long as
    /// the logger writes to it. If it cannot be opened the current output is
    /// left untouched.
    pub fn set_logfile(&self, path: impl AsRef<Path>) -> Result<(), LoggerError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggerError::OpenLogFile {
                path: path.to_path_buf(),
                source,
            })?;
        self.set_output(Tee {
            primary: io::stdout(),
            mirror: file,
        });
        Ok(())
    }

    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        *self.inner.notifier.write() = Some(notifier);
    }

    pub fn clear_notifier(&self) {
        *self.inner.notifier.write() = None;
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, false, Location::caller(), &message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, false, Location::caller(), &message);
    }

    /// Log at `Error` and hand a stack trace of the calling thread to the notifier.
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, true, Location::caller(), &message);
    }

    /// Like [`Logger::error`] but the notifier receives an empty trace.
    #[track_caller]
    pub fn error_without_trace(&self, message: impl fmt::Display) {
        self.log(Level::Error, false, Location::caller(), &message);
    }

    /// High-level lifecycle events such as stages starting or completing.
    #[track_caller]
    pub fn status(&self, message: impl fmt::Display) {
        self.log(Level::Status, false, Location::caller(), &message);
    }

    fn log(
        &self,
        level: Level,
        with_trace: bool,
        location: &'static Location<'static>,
        message: &dyn fmt::Display,
    ) {
        let enabled = level >= self.level();
        let notifier = self.inner.notifier.read().clone();
        if !enabled && notifier.is_none() {
            return;
        }

        let text = match self.caller_prefix() {
            CallerPrefix::Off => message.to_string(),
            CallerPrefix::ShortFile => {
                format!("{}:{}: {}", short_file(location.file()), location.line(), message)
            }
            CallerPrefix::LongFile => {
                format!("{}:{}: {}", location.file(), location.line(), message)
            }
        };

        if enabled {
            self.write_line(level, &text);
        }

        if let Some(notifier) = notifier {
            let trace = if with_trace {
                capture_trace()
            } else {
                Vec::new()
            };
            notifier.notify(level, &trace, &text);
        }
    }

    fn write_line(&self, level: Level, text: &str) {
        let timestamp = OffsetDateTime::now_utc()
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| "1970/01/01 00:00:00".to_string());
        let mut output = self.inner.output.lock();
        // Write errors are dropped.
        let _ = writeln!(output, "{} [{}] {}", timestamp, level, text);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("caller_prefix", &self.caller_prefix())
            .field("has_notifier", &self.inner.notifier.read().is_some())
            .finish()
    }
}

/// The process-wide default logger.
///
/// Meant for the outermost entry point only; library code should receive a
/// [`Logger`] from its caller instead of reaching for this.
pub fn default_logger() -> &'static Logger {
    static DEFAULT: OnceLock<Logger> = OnceLock::new();
    DEFAULT.get_or_init(Logger::new)
}

fn short_file(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}

fn capture_trace() -> Vec<u8> {
    let mut trace = Backtrace::force_capture().to_string().into_bytes();
    trace.truncate(TRACE_BUFFER_SIZE);
    trace
}

/// Writes every buffer to both sinks.
struct Tee<A, B> {
    primary: A,
    mirror: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.mirror.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.mirror.flush()
    }
}
