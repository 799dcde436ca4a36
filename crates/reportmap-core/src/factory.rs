//! Row-to-object factories
//!
//! `create_object` is the only way rows become domain objects, which is what
//! keeps one instance per (kind, id) in a session.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::Result;
use crate::model::DomainObject;
use crate::watcher::ObjectWatcher;

/// Validated store row carrying its primary key
pub trait EntityRow {
    fn id(&self) -> i64;
}

pub trait DomainObjectFactory {
    type Object: DomainObject;
    type Row: EntityRow;

    fn watcher(&self) -> &ObjectWatcher;

    /// Build a fresh object from a row; never consults the identity map
    ///
    /// # Errors
    ///
    /// Fails when related objects or embedded data cannot be resolved.
    fn do_create_object(&self, row: &Self::Row) -> Result<Self::Object>;

    /// Hook run once a freshly built object is mapped
    fn after_create(&self, _obj: &Rc<RefCell<Self::Object>>) {}

    /// Canonical instance for the row
    ///
    /// A mapped instance is returned untouched, even when the row carries
    /// newer values.
    ///
    /// # Errors
    ///
    /// Propagates `do_create_object` and registration failures.
    fn create_object(&self, row: &Self::Row) -> Result<Rc<RefCell<Self::Object>>> {
        if let Some(existing) = self.watcher().get_from_map::<Self::Object>(row.id()) {
            return Ok(existing);
        }
        let obj = Rc::new(RefCell::new(self.do_create_object(row)?));
        // building related objects may have mapped this key already
        if let Some(existing) = self.watcher().get_from_map::<Self::Object>(row.id()) {
            return Ok(existing);
        }
        self.watcher().add_to_map(&obj)?;
        self.after_create(&obj);
        tracing::debug!(
            entity = <Self::Object as DomainObject>::KIND.as_str(),
            entity_id = row.id(),
            "object created"
        );
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use std::cell::Cell;

    struct Row(i64, &'static str);

    impl EntityRow for Row {
        fn id(&self) -> i64 {
            self.0
        }
    }

    struct Factory {
        watcher: ObjectWatcher,
        built: Cell<usize>,
    }

    impl DomainObjectFactory for Factory {
        type Object = User;
        type Row = Row;

        fn watcher(&self) -> &ObjectWatcher {
            &self.watcher
        }

        fn do_create_object(&self, row: &Row) -> Result<User> {
            self.built.set(self.built.get() + 1);
            Ok(User::new(row.0, row.1))
        }
    }

    #[test]
    fn test_map_hit_skips_construction() {
        let factory = Factory {
            watcher: ObjectWatcher::new(),
            built: Cell::new(0),
        };
        let first = factory.create_object(&Row(1, "user1")).unwrap();
        let second = factory.create_object(&Row(1, "changed")).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(factory.built.get(), 1);
        assert_eq!(second.borrow().name(), "user1");
    }
}
