//! Store configuration
//!
//! Resolution order: defaults, then an optional TOML file, then the
//! `REPORTMAP_DB` environment variable. Callers apply their own explicit
//! overrides (the CLI `--db` flag) last.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{config_error, io_error, Result};

/// Environment variable overriding `db_path`
pub const DB_ENV: &str = "REPORTMAP_DB";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite file; `None` keeps the database in memory
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            foreign_keys: true,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// `Config` when the document is not valid TOML or has unknown keys.
    pub fn from_toml(origin: &str, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| config_error(origin, e.to_string()))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Config` when it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
        Self::from_toml(&path.display().to_string(), &content)
    }

    /// Defaults or the given file, with environment overrides applied
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::load`].
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Apply environment variable overrides (REPORTMAP_* prefix)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(db) = std::env::var(DB_ENV) {
            if !db.trim().is_empty() {
                self.db_path = Some(PathBuf::from(db));
            }
        }
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportmap_core::ExErrorKind;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.db_path, None);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StoreConfig::from_toml("inline", "db_path = \"reports.db\"\n").unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("reports.db")));
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StoreConfig::from_toml("inline", "dbpath = \"x\"\n").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reportmap.toml");
        fs::write(&path, "db_path = \"/tmp/r.db\"\nforeign_keys = false\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/r.db")));
        assert!(!config.foreign_keys);
    }

    #[test]
    fn test_missing_file_is_io() {
        let err = StoreConfig::load(Path::new("/nonexistent/reportmap.toml")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Io);
    }
}
