//! Data mapper template
//!
//! [`Mapper`] owns the persistence protocol shared by every entity type:
//! identity-map lookups, key assignment, snapshot-based dirty checking and
//! unit-of-work registration. Concrete mappers only supply the four `do_*`
//! store primitives.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::errors::{ExError, MapError, Result};
use crate::model::{DomainObject, IdentityObject};
use crate::watcher::{ObjectWatcher, OperationKind};
use crate::{log_op_end, log_op_error, log_op_start};

pub trait Mapper<T: DomainObject>: Clone + 'static {
    fn watcher(&self) -> &ObjectWatcher;

    /// Load and build the object for `id`, `None` when no row exists
    ///
    /// # Errors
    ///
    /// Store, row-validation and decoding failures.
    fn do_find(&self, id: i64) -> Result<Option<Rc<RefCell<T>>>>;

    /// Write a new row and return its generated key
    ///
    /// # Errors
    ///
    /// `Persistence` on constraint or connectivity failure.
    fn do_insert(&self, obj: &T) -> Result<i64>;

    /// Write `columns` of the object's row and return the affected row count
    ///
    /// # Errors
    ///
    /// `Persistence` on constraint or connectivity failure.
    fn do_update(&self, obj: &T, columns: &[&'static str]) -> Result<usize>;

    /// Delete the row for `id` and return the affected row count
    ///
    /// # Errors
    ///
    /// `Persistence` on constraint or connectivity failure.
    fn do_delete(&self, id: i64) -> Result<usize>;

    /// Hook run after an insert has registered the object
    fn after_insert(&self, _obj: &Rc<RefCell<T>>) {}

    /// Hook run after `columns` were written
    ///
    /// `before` is the snapshot the write was diffed against, when one existed.
    fn after_update(&self, _obj: &Rc<RefCell<T>>, _columns: &[&'static str], _before: Option<&IdentityObject>) {}

    /// Hook run after a delete has forgotten the object
    fn after_delete(&self, _obj: &Rc<RefCell<T>>) {}

    /// Canonical instance for `id`, loading it on a map miss
    ///
    /// # Errors
    ///
    /// `NotFound` when no row exists, otherwise whatever `do_find` reports.
    fn find(&self, id: i64) -> Result<Rc<RefCell<T>>> {
        if let Some(existing) = self.watcher().get_from_map::<T>(id) {
            tracing::debug!(entity = T::KIND.as_str(), entity_id = id, "identity map hit");
            return Ok(existing);
        }

        log_op_start!("mapper_find", entity = T::KIND.as_str(), entity_id = id);
        let start = Instant::now();

        let result = self.do_find(id).and_then(|found| {
            found.ok_or_else(|| MapError::NotFound { entity: T::KIND, id }.into())
        });

        match &result {
            Ok(_) => {
                log_op_end!(
                    "mapper_find",
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = id
                );
            }
            Err(e) => {
                log_op_error!(
                    "mapper_find",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = id
                );
            }
        }
        result
    }

    /// Persist a transient object; it takes the generated key and becomes
    /// the canonical instance for it
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the object already has a key, `Persistence` when
    /// the store rejects the row.
    fn insert(&self, obj: &Rc<RefCell<T>>) -> Result<i64> {
        log_op_start!("mapper_insert", entity = T::KIND.as_str());
        let start = Instant::now();

        let result = (|| -> Result<i64> {
            let existing_id = obj.borrow().id();
            if !obj.borrow().is_transient() {
                return Err(ExError::from(MapError::AlreadyPersisted {
                    entity: T::KIND,
                    id: existing_id,
                })
                .with_op("mapper_insert"));
            }
            let id = self.do_insert(&obj.borrow())?;
            obj.borrow_mut().set_id(id);
            self.watcher().add_to_map(obj)?;
            self.after_insert(obj);
            Ok(id)
        })();

        match &result {
            Ok(id) => {
                log_op_end!(
                    "mapper_insert",
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = *id
                );
            }
            Err(e) => {
                log_op_error!(
                    "mapper_insert",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str()
                );
            }
        }
        result
    }

    /// Write the object's changed columns and return their names
    ///
    /// Columns are diffed against the snapshot taken when the object was
    /// loaded or last written; without a snapshot every column is written.
    /// Nothing is written when nothing changed.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for transient objects, `NotFound` when the row is gone.
    fn update(&self, obj: &Rc<RefCell<T>>) -> Result<Vec<&'static str>> {
        let id = obj.borrow().id();
        log_op_start!("mapper_update", entity = T::KIND.as_str(), entity_id = id);
        let start = Instant::now();

        let result = (|| -> Result<Vec<&'static str>> {
            if obj.borrow().is_transient() {
                return Err(ExError::from(MapError::Unsaved { entity: T::KIND }).with_op("mapper_update"));
            }
            let before = self.watcher().snapshot::<T>(id);
            let columns: Vec<&'static str> = match self.watcher().changed_fields(obj) {
                Some(changed) => changed,
                None => T::KIND.identity_fields().to_vec(),
            }
            .into_iter()
            .filter(|field| *field != "id")
            .collect();

            if columns.is_empty() {
                tracing::debug!(entity = T::KIND.as_str(), entity_id = id, "update skipped, clean");
                return Ok(columns);
            }

            let affected = self.do_update(&obj.borrow(), &columns)?;
            if affected == 0 {
                return Err(ExError::from(MapError::NotFound { entity: T::KIND, id }).with_op("mapper_update"));
            }
            self.watcher().mark_clean(obj);
            self.after_update(obj, &columns, before.as_ref());
            Ok(columns)
        })();

        match &result {
            Ok(columns) => {
                log_op_end!(
                    "mapper_update",
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = id,
                    columns = columns.len() as u64
                );
            }
            Err(e) => {
                log_op_error!(
                    "mapper_update",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = id
                );
            }
        }
        result
    }

    /// Delete the object's row and forget the instance
    ///
    /// # Errors
    ///
    /// `InvalidInput` for transient objects, `NotFound` when the row is gone.
    fn delete(&self, obj: &Rc<RefCell<T>>) -> Result<()> {
        let id = obj.borrow().id();
        log_op_start!("mapper_delete", entity = T::KIND.as_str(), entity_id = id);
        let start = Instant::now();

        let result = (|| -> Result<()> {
            if obj.borrow().is_transient() {
                return Err(ExError::from(MapError::Unsaved { entity: T::KIND }).with_op("mapper_delete"));
            }
            if self.do_delete(id)? == 0 {
                return Err(ExError::from(MapError::NotFound { entity: T::KIND, id }).with_op("mapper_delete"));
            }
            self.watcher().remove_from_map::<T>(id);
            self.after_delete(obj);
            Ok(())
        })();

        match &result {
            Ok(()) => log_op_end!(
                "mapper_delete",
                duration_ms = start.elapsed().as_millis() as u64,
                entity = T::KIND.as_str(),
                entity_id = id
            ),
            Err(e) => {
                log_op_error!(
                    "mapper_delete",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = T::KIND.as_str(),
                    entity_id = id
                );
            }
        }
        result
    }

    /// Register an insert to run at the next flush
    fn queue_insert(&self, obj: &Rc<RefCell<T>>) {
        let key = obj.borrow().key();
        let (mapper, obj) = (self.clone(), Rc::clone(obj));
        self.watcher().queue_operation(
            key,
            OperationKind::Insert,
            Box::new(move || mapper.insert(&obj).map(|_| ())),
        );
    }

    /// Register an update to run at the next flush
    fn queue_update(&self, obj: &Rc<RefCell<T>>) {
        let key = obj.borrow().key();
        let (mapper, obj) = (self.clone(), Rc::clone(obj));
        self.watcher().queue_operation(
            key,
            OperationKind::Update,
            Box::new(move || mapper.update(&obj).map(|_| ())),
        );
    }

    /// Register a delete to run at the next flush
    fn queue_delete(&self, obj: &Rc<RefCell<T>>) {
        let key = obj.borrow().key();
        let (mapper, obj) = (self.clone(), Rc::clone(obj));
        self.watcher().queue_operation(
            key,
            OperationKind::Delete,
            Box::new(move || mapper.delete(&obj)),
        );
    }
}
