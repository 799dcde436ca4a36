use serde::{Deserialize, Serialize};

use super::identity_object::IdentityObject;
use super::value::Value;

/// Primary key carried by entities that have not been persisted yet
pub const UNSAVED_ID: i64 = -1;

/// The mapped entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Event,
    Report,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Event => "event",
            EntityKind::Report => "report",
        }
    }

    /// Fields that make up this kind's IdentityObject, in schema order
    pub fn identity_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::User => &["id", "name"],
            EntityKind::Event => &["id", "name", "start", "end", "report"],
            EntityKind::Report => &["id", "code", "data", "event", "user"],
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity map key: (entity type, primary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// One-to-many relations served by deferred collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Reports filed against an Event
    EventReports,
    /// Reports filed by a User
    UserReports,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::EventReports => "event.reports",
            Relation::UserReports => "user.reports",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain data holder with an identity
///
/// Domain objects know nothing about persistence; mappers and the identity
/// map work through this trait only.
pub trait DomainObject: 'static {
    const KIND: EntityKind;

    /// Primary key, `UNSAVED_ID` while transient
    fn id(&self) -> i64;

    /// Assigned once by the store on insert
    fn set_id(&mut self, id: i64);

    /// Current value of one identity field; unknown names yield `Null`
    fn field(&self, name: &str) -> Value;

    fn is_transient(&self) -> bool {
        self.id() == UNSAVED_ID
    }

    fn key(&self) -> EntityKey {
        EntityKey::new(Self::KIND, self.id())
    }

    fn identity(&self) -> IdentityObject
    where
        Self: Sized,
    {
        IdentityObject::capture(self)
    }
}
