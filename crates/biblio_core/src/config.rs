//! Runtime configuration for shells embedding the catalog.
//!
//! # Responsibility
//! - Describe where the catalog lives and how it logs and searches.
//! - Load that description from JSON and turn it into live resources.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - Unknown keys are rejected instead of silently ignored.

use crate::db::{open_db_in_memory, open_db_with_timeout, DbResult};
use crate::logging::{default_log_level, init_logging, normalize_level};
use crate::repo::book_repo::TextMatch;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration error for loading and applying `CatalogConfig`.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    /// A value parsed but is not acceptable.
    Invalid(String),
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) | Self::Logging(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Catalog runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// SQLite file; `None` opens a fresh in-memory catalog.
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling logs; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
    pub search_match: TextMatch,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
            search_match: TextMatch::default(),
        }
    }
}

impl CatalogConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(log_dir) = self.log_dir.as_ref() {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Opens the configured catalog with migrations applied.
    pub fn open_connection(&self) -> DbResult<Connection> {
        match self.database_path.as_ref() {
            Some(path) => open_db_with_timeout(path, self.busy_timeout()),
            None => open_db_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn start_logging(&self) -> Result<bool, ConfigError> {
        let Some(log_dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        let log_dir = log_dir.to_str().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "log_dir must be valid UTF-8, got `{}`",
                log_dir.display()
            ))
        })?;
        init_logging(&self.log_level, log_dir).map_err(ConfigError::Logging)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogConfig, ConfigError};
    use crate::repo::book_repo::TextMatch;
    use std::path::PathBuf;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CatalogConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.search_match, TextMatch::CaseSensitive);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn parses_all_fields() {
        let config = CatalogConfig::from_json_str(
            r#"{
                "database_path": "/var/lib/biblio/catalog.db",
                "busy_timeout_ms": 250,
                "log_level": "WARN",
                "log_dir": "/var/log/biblio",
                "search_match": "case_insensitive"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/biblio/catalog.db"))
        );
        assert_eq!(config.busy_timeout().as_millis(), 250);
        assert_eq!(config.search_match, TextMatch::CaseInsensitive);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let err = CatalogConfig::from_json_str(r#"{"databse_path": "x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = CatalogConfig::from_json_str(r#"{"busy_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CatalogConfig::from_json_str(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CatalogConfig::from_json_str(r#"{"log_dir": "logs"}"#).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CatalogConfig::from_file("/nonexistent/biblio/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/biblio/config.json"));
    }

    #[test]
    fn start_logging_is_noop_without_log_dir() {
        assert!(!CatalogConfig::default().start_logging().unwrap());
    }

    #[test]
    fn default_config_opens_seeded_in_memory_catalog() {
        let conn = CatalogConfig::default().open_connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM categorias;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 5);
    }
}
