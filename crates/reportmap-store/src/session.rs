//! Session: one identity map, one unit of work, one store connection
//!
//! Mappers handed out by a session share its watcher, so every lookup in the
//! session sees the same instances. Dropping the session resets the map.

use std::rc::Rc;

use reportmap_core::{DocumentCodec, FlushSummary, Gateway, ObjectWatcher};

use crate::codec::YamlCodec;
use crate::config::StoreConfig;
use crate::db;
use crate::errors::Result;
use crate::gateway::SqliteGateway;
use crate::mapper::{EventMapper, MapperContext, ReportMapper, UserMapper};

pub struct Session {
    ctx: MapperContext,
}

impl Session {
    pub fn new(gateway: Rc<dyn Gateway>, codec: Rc<dyn DocumentCodec>) -> Self {
        let watcher = ObjectWatcher::new();
        tracing::debug!(session_id = %watcher.session_id(), "session opened");
        Self {
            ctx: MapperContext::new(gateway, codec, watcher),
        }
    }

    /// SQLite + YAML session for a resolved configuration
    ///
    /// # Errors
    ///
    /// Open, configure and migration failures.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = db::open_configured(config)?;
        Ok(Self::new(
            Rc::new(SqliteGateway::new(conn)),
            Rc::new(YamlCodec::new()),
        ))
    }

    /// Migrated in-memory session
    ///
    /// # Errors
    ///
    /// See [`Session::open`].
    pub fn in_memory() -> Result<Self> {
        Self::open(&StoreConfig::default())
    }

    pub fn user_mapper(&self) -> UserMapper {
        UserMapper::new(self.ctx.clone())
    }

    pub fn event_mapper(&self) -> EventMapper {
        EventMapper::new(self.ctx.clone())
    }

    pub fn report_mapper(&self) -> ReportMapper {
        ReportMapper::new(self.ctx.clone())
    }

    pub fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    pub fn gateway(&self) -> Rc<dyn Gateway> {
        self.ctx.gateway.clone()
    }

    pub fn codec(&self) -> Rc<dyn DocumentCodec> {
        self.ctx.codec.clone()
    }

    /// Flush the unit of work
    ///
    /// # Errors
    ///
    /// See [`ObjectWatcher::perform_operations`].
    pub fn perform_operations(&self) -> Result<FlushSummary> {
        self.ctx.watcher.perform_operations()
    }

    /// Forget every mapped instance and queued operation
    pub fn reset(&self) {
        self.ctx.watcher.reset();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ctx.watcher.reset();
        tracing::debug!(session_id = %self.ctx.watcher.session_id(), "session closed");
    }
}

/// Run `f` in a fresh session and flush whatever it queued
///
/// # Errors
///
/// Propagates failures from opening, `f`, or the final flush.
pub fn with_session<R>(config: &StoreConfig, f: impl FnOnce(&Session) -> Result<R>) -> Result<R> {
    let session = Session::open(config)?;
    let out = f(&session)?;
    session.perform_operations()?;
    Ok(out)
}
