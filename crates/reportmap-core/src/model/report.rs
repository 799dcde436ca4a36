use super::document::Document;
use super::entity::{DomainObject, EntityKind, UNSAVED_ID};
use super::value::Value;
use super::{EventRef, UserRef};

/// A filled-in report: a code, its data document, and the Event and User it
/// belongs to
///
/// Event and User are shared handles; every Report in a session that points
/// at Event#1 points at the same instance.
#[derive(Debug)]
pub struct Report {
    id: i64,
    code: String,
    data: Document,
    event: EventRef,
    user: UserRef,
}

impl Report {
    pub fn new(
        id: i64,
        code: impl Into<String>,
        data: Document,
        event: EventRef,
        user: UserRef,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            data,
            event,
            user,
        }
    }

    pub fn transient(
        code: impl Into<String>,
        data: Document,
        event: EventRef,
        user: UserRef,
    ) -> Self {
        Self::new(UNSAVED_ID, code, data, event, user)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Document {
        &mut self.data
    }

    pub fn set_data(&mut self, data: Document) {
        self.data = data;
    }

    pub fn event(&self) -> EventRef {
        self.event.clone()
    }

    pub fn set_event(&mut self, event: EventRef) {
        self.event = event;
    }

    pub fn user(&self) -> UserRef {
        self.user.clone()
    }

    pub fn set_user(&mut self, user: UserRef) {
        self.user = user;
    }

    /// Primary key of the referenced Event, `None` while it is borrowed mutably
    pub fn event_id(&self) -> Option<i64> {
        self.event.try_borrow().ok().map(|e| e.id())
    }

    /// Primary key of the referenced User, `None` while it is borrowed mutably
    pub fn user_id(&self) -> Option<i64> {
        self.user.try_borrow().ok().map(|u| u.id())
    }
}

impl DomainObject for Report {
    const KIND: EntityKind = EntityKind::Report;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => Value::Integer(self.id),
            "code" => Value::from(self.code.as_str()),
            "data" => Value::Text(self.data.fingerprint()),
            "event" => Value::from(self.event_id()),
            "user" => Value::from(self.user_id()),
            _ => Value::Null,
        }
    }
}
