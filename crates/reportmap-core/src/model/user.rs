use std::rc::Rc;

use super::entity::{DomainObject, EntityKind, UNSAVED_ID};
use super::value::Value;
use super::ReportCollection;

/// A person filing reports
#[derive(Debug)]
pub struct User {
    id: i64,
    name: String,
    reports: Option<Rc<ReportCollection>>,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            reports: None,
        }
    }

    /// A user not yet known to the store
    pub fn transient(name: impl Into<String>) -> Self {
        Self::new(UNSAVED_ID, name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The user's reports; `None` until a mapper has attached the relation
    pub fn reports(&self) -> Option<Rc<ReportCollection>> {
        self.reports.clone()
    }

    pub fn set_reports(&mut self, reports: Rc<ReportCollection>) {
        self.reports = Some(reports);
    }
}

impl DomainObject for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => Value::Integer(self.id),
            "name" => Value::from(self.name.as_str()),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_user() {
        let user = User::transient("user1");
        assert!(user.is_transient());
        assert_eq!(user.name(), "user1");
        assert!(user.reports().is_none());
    }

    #[test]
    fn test_identity_tracks_name() {
        let mut user = User::new(7, "user1");
        let before = user.identity();
        user.set_name("user2");
        assert_eq!(before.changed_fields(&user.identity()), vec!["name"]);
    }
}
