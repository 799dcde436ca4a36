//! ReportMap Core - object/relational mapping kernel
//!
//! This crate provides the persistence-agnostic half of ReportMap:
//! - User, Event and Report domain objects plus the composite report document
//! - IdentityObject snapshots for equality and dirty checking
//! - The identity map and unit of work (`ObjectWatcher`)
//! - Deferred one-to-many collections resolved in batches
//! - The `Mapper` template and the `Gateway` / `DocumentCodec` seams a store
//!   adapter implements
//!
//! Everything here is single-threaded; a session lives on one thread.

pub mod codec;
pub mod deferred;
pub mod errors;
pub mod factory;
pub mod gateway;
pub mod logging_facility;
pub mod mapper;
pub mod model;
pub mod watcher;

// Used by the logging macros
pub use reportmap_core_types;

// Re-export commonly used types
pub use codec::DocumentCodec;
pub use deferred::{CollectionLoader, CollectionState, DeferredCollection, PendingLoad};
pub use errors::{ExError, ExErrorKind, MapError, Result};
pub use factory::{DomainObjectFactory, EntityRow};
pub use gateway::{ExecResult, Gateway, Row};
pub use mapper::Mapper;
pub use model::{
    Document, DocumentTree, DomainObject, EntityKey, EntityKind, Event, EventRef, IdentityObject,
    NodeId, Relation, Report, ReportCollection, ReportRef, User, UserRef, Value, UNSAVED_ID,
};
pub use watcher::{FlushSummary, ObjectWatcher, OperationKind, WeakWatcher};
