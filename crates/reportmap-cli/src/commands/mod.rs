//! CLI command implementations

pub mod event;
pub mod init;
pub mod report;
pub mod user;

use std::path::PathBuf;

use clap::Args;
use reportmap_core::{Document, NodeId, Value};
use reportmap_store::StoreConfig;

/// Store file used when neither flags, config nor environment name one
pub const DEFAULT_DB: &str = ".reportmap/store.db";

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// SQLite store file (overrides config and REPORTMAP_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML store configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Defaults, then config file, then environment, then `--db`
    pub fn store_config(&self) -> CliResult<StoreConfig> {
        let mut config = StoreConfig::resolve(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config = config.with_db_path(db);
        }
        let path = config.db_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(config.with_db_path(path))
    }
}

/// `42` becomes an integer, `~` null, anything else text
pub fn parse_value(raw: &str) -> Value {
    if raw == "~" {
        return Value::Null;
    }
    match raw.parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::from(raw),
    }
}

/// `(path, value)` for every field, in document order
pub fn document_fields(doc: &Document) -> CliResult<Vec<(String, Value)>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = vec![doc.root()];
    while let Some(node) = stack.pop() {
        match doc.value(node)? {
            Some(value) => out.push((doc.path(node)?, value.clone())),
            None => stack.extend(doc.children(node)?.iter().rev().copied()),
        }
    }
    Ok(out)
}
