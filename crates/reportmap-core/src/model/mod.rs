pub mod document;
pub mod entity;
pub mod event;
pub mod identity_object;
pub mod report;
pub mod user;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use crate::deferred::DeferredCollection;

pub use document::{Document, DocumentTree, NodeId};
pub use entity::{DomainObject, EntityKey, EntityKind, Relation, UNSAVED_ID};
pub use event::Event;
pub use identity_object::IdentityObject;
pub use report::Report;
pub use user::User;
pub use value::Value;

/// Shared handle to the canonical User instance of a session
pub type UserRef = Rc<RefCell<User>>;
/// Shared handle to the canonical Event instance of a session
pub type EventRef = Rc<RefCell<Event>>;
/// Shared handle to the canonical Report instance of a session
pub type ReportRef = Rc<RefCell<Report>>;
/// Lazily loaded Reports of a User or Event
pub type ReportCollection = DeferredCollection<Report>;
