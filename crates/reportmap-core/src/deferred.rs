//! Deferred (lazy) one-to-many collections
//!
//! A collection starts `Unloaded`. First access queues one load on the
//! session's unit of work and moves it to `Pending`; the next flush resolves
//! every adjacent pending load of the same relation with one fetch and moves
//! each collection to `Loaded`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::errors::{MapError, Result};
use crate::model::{DomainObject, Relation};
use crate::watcher::{ObjectWatcher, WeakWatcher};

/// Shared handles keyed by owner id, as returned by a batched fetch
pub type LoadedByOwner<T> = HashMap<i64, Vec<Rc<RefCell<T>>>>;

/// Fetches the members of many collections of one relation at once
pub trait CollectionLoader<T: DomainObject> {
    /// Members for each requested owner; owners without members may be absent
    ///
    /// # Errors
    ///
    /// Propagates store and decoding failures.
    fn load_many(&self, watcher: &ObjectWatcher, owner_ids: &[i64]) -> Result<LoadedByOwner<T>>;
}

/// Type-erased view of a queued collection load
pub trait PendingLoad {
    fn relation(&self) -> Relation;
    fn owner_id(&self) -> i64;
    fn as_any(&self) -> &dyn Any;

    /// Load `batch` (which includes `self`) with a single fetch
    ///
    /// # Errors
    ///
    /// Propagates the loader's failure; no member changes state in that case.
    fn resolve_batch(&self, watcher: &ObjectWatcher, batch: &[Rc<dyn PendingLoad>]) -> Result<()>;

    /// Drop back to unloaded, releasing any members
    fn unload(&self);
}

/// Observable collection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Unloaded,
    Pending,
    Loaded,
}

enum LoadState<T> {
    Unloaded,
    Pending,
    Loaded(Vec<Rc<RefCell<T>>>),
}

/// Members of a relation, fetched on first access
pub struct DeferredCollection<T: DomainObject> {
    relation: Relation,
    owner_id: i64,
    watcher: WeakWatcher,
    loader: Rc<dyn CollectionLoader<T>>,
    state: RefCell<LoadState<T>>,
    this: Weak<Self>,
}

impl<T: DomainObject> DeferredCollection<T> {
    pub fn new(
        watcher: &ObjectWatcher,
        relation: Relation,
        owner_id: i64,
        loader: Rc<dyn CollectionLoader<T>>,
    ) -> Rc<Self> {
        let collection = Rc::new_cyclic(|this| Self {
            relation,
            owner_id,
            watcher: watcher.downgrade(),
            loader,
            state: RefCell::new(LoadState::Unloaded),
            this: this.clone(),
        });
        let tracked: Weak<dyn PendingLoad> = Rc::downgrade(&collection) as Weak<dyn PendingLoad>;
        watcher.track_collection(tracked);
        collection
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn state(&self) -> CollectionState {
        match &*self.state.borrow() {
            LoadState::Unloaded => CollectionState::Unloaded,
            LoadState::Pending => CollectionState::Pending,
            LoadState::Loaded(_) => CollectionState::Loaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == CollectionState::Loaded
    }

    fn session(&self) -> Result<ObjectWatcher> {
        self.watcher
            .upgrade()
            .ok_or_else(|| MapError::SessionClosed.into())
    }

    /// Queue this collection's load unless it is already queued or loaded
    ///
    /// # Errors
    ///
    /// Fails when the owning session has been dropped.
    pub fn notify_access(&self) -> Result<()> {
        if !matches!(&*self.state.borrow(), LoadState::Unloaded) {
            return Ok(());
        }
        let watcher = self.session()?;
        let pending: Rc<dyn PendingLoad> = match self.this.upgrade() {
            Some(this) => this as Rc<dyn PendingLoad>,
            None => {
                return Err(MapError::Internal {
                    message: format!("{} collection #{} outlived itself", self.relation, self.owner_id),
                }
                .into())
            }
        };
        *self.state.borrow_mut() = LoadState::Pending;
        watcher.queue_load(pending);
        Ok(())
    }

    /// Members, loading them first if needed
    ///
    /// An unloaded collection queues its load and flushes the session, so
    /// any writes queued ahead of it are applied first.
    ///
    /// # Errors
    ///
    /// Fails when the session is gone or the flush fails.
    pub fn items(&self) -> Result<Vec<Rc<RefCell<T>>>> {
        if let Some(items) = self.loaded_items() {
            return Ok(items);
        }
        self.notify_access()?;
        self.session()?.perform_operations()?;
        self.loaded_items().ok_or_else(|| {
            MapError::Internal {
                message: format!(
                    "{} collection #{} still unloaded after flush",
                    self.relation, self.owner_id
                ),
            }
            .into()
        })
    }

    /// Iterate members; each call starts from the beginning
    ///
    /// # Errors
    ///
    /// See [`DeferredCollection::items`].
    pub fn iter(&self) -> Result<std::vec::IntoIter<Rc<RefCell<T>>>> {
        Ok(self.items()?.into_iter())
    }

    /// # Errors
    ///
    /// See [`DeferredCollection::items`].
    pub fn len(&self) -> Result<usize> {
        Ok(self.items()?.len())
    }

    /// # Errors
    ///
    /// See [`DeferredCollection::items`].
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.items()?.is_empty())
    }

    /// True when `obj` is one of the members (instance identity)
    ///
    /// # Errors
    ///
    /// See [`DeferredCollection::items`].
    pub fn contains(&self, obj: &Rc<RefCell<T>>) -> Result<bool> {
        Ok(self.items()?.iter().any(|item| Rc::ptr_eq(item, obj)))
    }

    /// Members if already loaded; never triggers a load
    pub fn loaded_items(&self) -> Option<Vec<Rc<RefCell<T>>>> {
        match &*self.state.borrow() {
            LoadState::Loaded(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Append a freshly inserted member when the collection is loaded
    ///
    /// Unloaded and pending collections pick it up from the store instead.
    pub fn add_if_loaded(&self, obj: &Rc<RefCell<T>>) -> bool {
        match &mut *self.state.borrow_mut() {
            LoadState::Loaded(items) => {
                if !items.iter().any(|item| Rc::ptr_eq(item, obj)) {
                    items.push(Rc::clone(obj));
                }
                true
            }
            _ => false,
        }
    }

    /// Drop a member that was deleted or moved to another owner
    ///
    /// Returns true when the collection was loaded and held `obj`.
    pub fn remove_if_loaded(&self, obj: &Rc<RefCell<T>>) -> bool {
        match &mut *self.state.borrow_mut() {
            LoadState::Loaded(items) => {
                let before = items.len();
                items.retain(|item| !Rc::ptr_eq(item, obj));
                items.len() != before
            }
            _ => false,
        }
    }

    fn fill(&self, items: Vec<Rc<RefCell<T>>>) {
        *self.state.borrow_mut() = LoadState::Loaded(items);
    }
}

impl<T: DomainObject> PendingLoad for DeferredCollection<T> {
    fn relation(&self) -> Relation {
        self.relation
    }

    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn resolve_batch(&self, watcher: &ObjectWatcher, batch: &[Rc<dyn PendingLoad>]) -> Result<()> {
        let mut owner_ids: Vec<i64> = Vec::with_capacity(batch.len());
        for pending in batch {
            if !owner_ids.contains(&pending.owner_id()) {
                owner_ids.push(pending.owner_id());
            }
        }

        let loaded = self.loader.load_many(watcher, &owner_ids)?;
        tracing::debug!(
            relation = %self.relation,
            owners = owner_ids.len(),
            collections = batch.len(),
            "deferred collections resolved"
        );

        for pending in batch {
            let collection = pending
                .as_any()
                .downcast_ref::<DeferredCollection<T>>()
                .ok_or_else(|| MapError::Internal {
                    message: format!("mixed member types in {} load batch", self.relation),
                })?;
            // several collections may share an owner, so clone rather than take
            let items = loaded.get(&collection.owner_id).cloned().unwrap_or_default();
            collection.fill(items);
        }
        Ok(())
    }

    fn unload(&self) {
        *self.state.borrow_mut() = LoadState::Unloaded;
    }
}

impl<T: DomainObject> std::fmt::Debug for DeferredCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.borrow() {
            LoadState::Unloaded => "unloaded".to_string(),
            LoadState::Pending => "pending".to_string(),
            LoadState::Loaded(items) => format!("loaded({})", items.len()),
        };
        f.debug_struct("DeferredCollection")
            .field("relation", &self.relation)
            .field("owner_id", &self.owner_id)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::model::User;
    use std::cell::Cell;

    /// Serves users whose id equals the owner id plus 100
    struct FakeLoader {
        calls: Cell<usize>,
        seen: RefCell<Vec<Vec<i64>>>,
    }

    impl FakeLoader {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            })
        }
    }

    impl CollectionLoader<User> for FakeLoader {
        fn load_many(&self, watcher: &ObjectWatcher, owner_ids: &[i64]) -> Result<LoadedByOwner<User>> {
            self.calls.set(self.calls.get() + 1);
            self.seen.borrow_mut().push(owner_ids.to_vec());
            let mut out = HashMap::new();
            for owner in owner_ids {
                let id = owner + 100;
                let user = match watcher.get_from_map::<User>(id) {
                    Some(existing) => existing,
                    None => {
                        let fresh = Rc::new(RefCell::new(User::new(id, format!("member{}", id))));
                        watcher.add_to_map(&fresh)?;
                        fresh
                    }
                };
                out.insert(*owner, vec![user]);
            }
            Ok(out)
        }
    }

    #[test]
    fn test_access_queues_exactly_one_load() {
        let watcher = ObjectWatcher::new();
        let loader = FakeLoader::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, loader.clone());

        assert_eq!(coll.state(), CollectionState::Unloaded);
        coll.notify_access().unwrap();
        coll.notify_access().unwrap();
        assert_eq!(coll.state(), CollectionState::Pending);
        assert_eq!(watcher.pending_labels(), vec!["load:user.reports#1"]);
        assert_eq!(loader.calls.get(), 0);
    }

    #[test]
    fn test_adjacent_loads_share_one_fetch() {
        let watcher = ObjectWatcher::new();
        let loader = FakeLoader::new();
        let a = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, loader.clone());
        let b = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 2, loader.clone());
        a.notify_access().unwrap();
        b.notify_access().unwrap();

        let summary = watcher.perform_operations().unwrap();
        assert_eq!(summary.load_batches, 1);
        assert_eq!(loader.calls.get(), 1);
        assert_eq!(*loader.seen.borrow(), vec![vec![1, 2]]);
        assert!(a.is_loaded() && b.is_loaded());
        assert_eq!(a.items().unwrap()[0].borrow().id(), 101);
        assert_eq!(b.items().unwrap()[0].borrow().id(), 102);
    }

    #[test]
    fn test_same_owner_collections_see_same_instances() {
        let watcher = ObjectWatcher::new();
        let loader = FakeLoader::new();
        let a = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 3, loader.clone());
        let b = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 3, loader.clone());
        a.notify_access().unwrap();
        b.notify_access().unwrap();
        assert_eq!(watcher.pending_operations(), 2);

        watcher.perform_operations().unwrap();
        assert_eq!(*loader.seen.borrow(), vec![vec![3]]);
        let left = a.items().unwrap();
        let right = b.items().unwrap();
        assert!(Rc::ptr_eq(&left[0], &right[0]));
    }

    #[test]
    fn test_iter_forces_and_restarts() {
        let watcher = ObjectWatcher::new();
        let loader = FakeLoader::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 4, loader.clone());

        assert_eq!(coll.iter().unwrap().count(), 1);
        assert_eq!(coll.iter().unwrap().count(), 1);
        assert_eq!(loader.calls.get(), 1);
        assert!(coll.contains(&watcher.get_from_map::<User>(104).unwrap()).unwrap());
    }

    #[test]
    fn test_reset_reverts_pending_to_unloaded() {
        let watcher = ObjectWatcher::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, FakeLoader::new());
        coll.notify_access().unwrap();
        watcher.reset();
        assert_eq!(coll.state(), CollectionState::Unloaded);

        coll.notify_access().unwrap();
        assert_eq!(watcher.pending_operations(), 1);
    }

    #[test]
    fn test_reset_releases_loaded_members() {
        let watcher = ObjectWatcher::new();
        let loader = FakeLoader::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, loader.clone());
        let before = coll.items().unwrap();
        watcher.reset();
        assert_eq!(coll.state(), CollectionState::Unloaded);

        let after = coll.items().unwrap();
        assert_eq!(loader.calls.get(), 2);
        assert!(!Rc::ptr_eq(&before[0], &after[0]));
    }

    #[test]
    fn test_add_if_loaded() {
        let watcher = ObjectWatcher::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, FakeLoader::new());
        let extra = Rc::new(RefCell::new(User::new(7, "extra")));
        assert!(!coll.add_if_loaded(&extra));

        coll.items().unwrap();
        assert!(coll.add_if_loaded(&extra));
        assert!(coll.add_if_loaded(&extra));
        assert_eq!(coll.len().unwrap(), 2);
    }

    #[test]
    fn test_remove_if_loaded() {
        let watcher = ObjectWatcher::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, FakeLoader::new());
        let extra = Rc::new(RefCell::new(User::new(7, "extra")));
        assert!(!coll.remove_if_loaded(&extra));

        coll.items().unwrap();
        coll.add_if_loaded(&extra);
        assert!(coll.remove_if_loaded(&extra));
        assert!(!coll.remove_if_loaded(&extra));
        assert_eq!(coll.len().unwrap(), 1);
        assert!(!coll.contains(&extra).unwrap());
    }

    #[test]
    fn test_dropped_session_is_reported() {
        let watcher = ObjectWatcher::new();
        let coll = DeferredCollection::<User>::new(&watcher, Relation::UserReports, 1, FakeLoader::new());
        drop(watcher);
        let err = coll.notify_access().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Internal);
    }
}
