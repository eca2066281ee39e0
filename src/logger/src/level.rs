use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Severity of a log event, in increasing order of importance.
///
/// `Silent` is only meaningful as a threshold: nothing is ever emitted at it,
/// so setting it as the minimum level mutes the output entirely while the
/// notifier keeps receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    #[default]
    Info = 1,
    Error = 2,
    Status = 3,
    Silent = 4,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
            Level::Status => "STATUS",
            Level::Silent => "SILENT",
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Error,
            3 => Level::Status,
            _ => Level::Silent,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "error" => Ok(Level::Error),
            "status" => Ok(Level::Status),
            "silent" => Ok(Level::Silent),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Whether and how the call site is prepended to each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CallerPrefix {
    #[default]
    Off = 0,
    /// `file.rs:42:`
    ShortFile = 1,
    /// `src/flow/src/file.rs:42:`
    LongFile = 2,
}

impl CallerPrefix {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CallerPrefix::ShortFile,
            2 => CallerPrefix::LongFile,
            _ => CallerPrefix::Off,
        }
    }
}
