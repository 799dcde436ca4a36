//! ReportMap Store - SQLite persistence for the mapping kernel
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migration
//! - `SqliteGateway` implementing the core `Gateway` seam
//! - Typed row validation and object factories
//! - User, Event and Report mappers with batched deferred collection loaders
//! - The YAML document codec
//! - `Session`, tying one connection to one identity map
//! - TOML store configuration

pub mod codec;
pub mod config;
pub mod db;
pub mod errors;
pub mod factory;
pub mod gateway;
pub mod mapper;
pub mod migrations;
pub mod rows;
pub mod session;

// Re-export key types
pub use codec::YamlCodec;
pub use config::StoreConfig;
pub use errors::Result;
pub use gateway::SqliteGateway;
pub use mapper::{EventMapper, MapperContext, ReportMapper, UserMapper};
pub use session::{with_session, Session};
