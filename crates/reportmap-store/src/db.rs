//! Database connection management
//!
//! Provides utilities for opening and managing SQLite connections

use crate::config::StoreConfig;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection
pub fn configure(conn: &Connection, foreign_keys: bool) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", foreign_keys)
        .map_err(from_rusqlite)?;
    Ok(())
}

/// Open, configure and migrate the database a config points at
pub fn open_configured(config: &StoreConfig) -> Result<Connection> {
    let mut conn = match &config.db_path {
        Some(path) => open(path)?,
        None => open_in_memory()?,
    };
    configure(&conn, config.foreign_keys)?;
    apply_migrations(&mut conn)?;
    tracing::debug!(
        db_path = ?config.db_path,
        foreign_keys = config.foreign_keys,
        "store opened"
    );
    Ok(conn)
}
