//! Core runtime configuration.
//!
//! # Responsibility
//! - Parse the JSON configuration consumed by embedders and the CLI probe.
//! - Turn configuration into an open connection, active logging and the
//!   default request locale.
//!
//! # Invariants
//! - Every field is optional in the JSON document.
//! - A missing `db_path` means an in-memory database.
//! - A missing `log_dir` means logging is left untouched.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::model::locale::Locale;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` skips logging setup.
    pub log_dir: Option<String>,
    /// Locale tag used when a caller does not pass one.
    pub default_locale: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            default_locale: String::new(),
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Opens the configured database with migrations applied.
    pub fn open_connection(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts logging when `log_dir` is set; returns whether it did.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match &self.log_dir {
            Some(log_dir) => {
                init_logging(&self.log_level, log_dir)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn locale(&self) -> Locale {
        Locale::new(&self.default_locale)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::logging::default_log_level;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.log_level, default_log_level());
        assert!(config.locale().is_neutral());
    }

    #[test]
    fn parses_all_fields() {
        let config = CoreConfig::from_json_str(
            r#"{"db_path":"/tmp/materia.db","log_level":"warn","log_dir":"/tmp/logs","default_locale":" en "}"#,
        )
        .unwrap();
        assert_eq!(config.db_path.as_deref(), Some(std::path::Path::new("/tmp/materia.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir.as_deref(), Some("/tmp/logs"));
        assert_eq!(config.locale().as_str(), "en");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = CoreConfig::from_json_str("{\"db_path\": 5}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn file_config_opens_migrated_database() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("materia.json");
        let db_path = dir.path().join("materia.db");
        std::fs::write(
            &config_path,
            serde_json::json!({ "db_path": db_path }).to_string(),
        )
        .unwrap();

        let config = CoreConfig::load(&config_path).unwrap();
        assert!(!config.init_logging().unwrap());
        let conn = config.open_connection().unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert!(version > 0);
        assert!(db_path.exists());
    }
}
