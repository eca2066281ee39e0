use flow::IoReaderConfig;
use logger::{CallerPrefix, Level};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub reader: IoReaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Level,
    pub caller_prefix: CallerPrefix,
    /// Mirror console output into this file, opened for append.
    pub file: Option<String>,
    /// Forward every event to a `tracing` subscriber as well.
    pub forward_to_tracing: bool,
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            caller_prefix: CallerPrefix::Off,
            file: None,
            forward_to_tracing: false,
            tracing_level: "info".to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse yaml config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn load_required(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::load_required(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("pipeflow.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn loads_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_optional(dir.path().join("missing.yaml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn defaults_match_reader_and_logger_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, Level::Info);
        assert_eq!(cfg.logging.caller_prefix, CallerPrefix::Off);
        assert!(cfg.logging.file.is_none());
        assert!(!cfg.logging.forward_to_tracing);
        assert_eq!(cfg.logging.tracing_level, "info");
        assert_eq!(cfg.reader, IoReaderConfig::default());
    }

    #[test]
    fn applies_only_present_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
reader:
  line_by_line: false
"#,
        );

        let cfg = AppConfig::load_required(&path).unwrap();
        assert!(!cfg.reader.line_by_line);
        assert_eq!(cfg.reader.buffer_size, 1024);
        assert!(!cfg.reader.gzipped);
        assert_eq!(cfg.logging.level, Level::Info);
    }

    #[test]
    fn loads_logging_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
logging:
  level: debug
  caller_prefix: short_file
  file: "./tmp/pipeflow.log"
  forward_to_tracing: true
  tracing_level: warn
reader:
  buffer_size: 4096
  gzipped: true
"#,
        );

        let cfg = AppConfig::load_required(&path).unwrap();
        assert_eq!(cfg.logging.level, Level::Debug);
        assert_eq!(cfg.logging.caller_prefix, CallerPrefix::ShortFile);
        assert_eq!(cfg.logging.file.as_deref(), Some("./tmp/pipeflow.log"));
        assert!(cfg.logging.forward_to_tracing);
        assert_eq!(cfg.logging.tracing_level, "warn");
        assert_eq!(cfg.reader.buffer_size, 4096);
        assert!(cfg.reader.gzipped);
    }

    #[test]
    fn rejects_unknown_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "logging:\n  level: loud\n");
        let err = AppConfig::load_required(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_required_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_required(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }
}
