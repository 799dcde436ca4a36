//! Identity map and unit of work
//!
//! An [`ObjectWatcher`] is one session's registry of canonical instances,
//! keyed by (entity kind, primary key), together with the queue of pending
//! operations flushed by [`ObjectWatcher::perform_operations`].
//!
//! The watcher is a cheap `Rc` handle. It is deliberately `!Send`: a session
//! belongs to one thread and nothing in here locks.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Instant;

use reportmap_core_types::SessionId;

use crate::deferred::PendingLoad;
use crate::errors::{ExError, ExErrorKind, MapError, Result};
use crate::model::{DomainObject, EntityKey, EntityKind, IdentityObject, Relation};
use crate::{log_op_end, log_op_error, log_op_start};

/// Kinds of queued operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    LoadCollection,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::LoadCollection => "load",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred write executed during a flush; kept queued and rerun if it fails
pub type WriteTask = Box<dyn FnMut() -> Result<()>>;

enum Operation {
    Load(Rc<dyn PendingLoad>),
    Write {
        kind: OperationKind,
        key: EntityKey,
        task: WriteTask,
    },
}

impl Operation {
    fn label(&self) -> String {
        match self {
            Operation::Load(pending) => load_label(pending.relation(), pending.owner_id()),
            Operation::Write { kind, key, .. } => format!("{}:{}", kind, key),
        }
    }
}

fn load_label(relation: Relation, owner_id: i64) -> String {
    format!("load:{}#{}", relation, owner_id)
}

/// Outcome of a successful flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Labels of the executed operations, in execution order
    pub applied: Vec<String>,
    /// Number of store round trips spent on collection loads
    pub load_batches: usize,
}

struct WatcherInner {
    session_id: SessionId,
    map: RefCell<HashMap<EntityKey, Rc<dyn Any>>>,
    snapshots: RefCell<HashMap<EntityKey, IdentityObject>>,
    queue: RefCell<VecDeque<Operation>>,
    collections: RefCell<Vec<Weak<dyn PendingLoad>>>,
}

/// Identity map + unit-of-work queue for one session
///
/// Queued writes capture their mapper, and the mapper holds a strong
/// handle back to this watcher. A watcher dropped with writes still queued
/// therefore never frees; flush it successfully or call
/// [`ObjectWatcher::reset`] before letting the last handle go.
/// Store sessions reset on drop.
#[derive(Clone)]
pub struct ObjectWatcher {
    inner: Rc<WatcherInner>,
}

/// Non-owning handle held by objects the watcher itself keeps alive
#[derive(Clone)]
pub struct WeakWatcher(Weak<WatcherInner>);

impl WeakWatcher {
    pub fn upgrade(&self) -> Option<ObjectWatcher> {
        self.0.upgrade().map(|inner| ObjectWatcher { inner })
    }
}

impl Default for ObjectWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectWatcher")
            .field("session_id", &self.inner.session_id)
            .field("mapped", &self.len())
            .field("queued", &self.pending_operations())
            .finish()
    }
}

impl ObjectWatcher {
    /// Start a fresh, empty session
    pub fn new() -> Self {
        let session_id = SessionId::new();
        tracing::debug!(session_id = %session_id, "identity map session created");
        Self {
            inner: Rc::new(WatcherInner {
                session_id,
                map: RefCell::new(HashMap::new()),
                snapshots: RefCell::new(HashMap::new()),
                queue: RefCell::new(VecDeque::new()),
                collections: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn downgrade(&self) -> WeakWatcher {
        WeakWatcher(Rc::downgrade(&self.inner))
    }

    /// True when both handles refer to the same session
    pub fn same_session(&self, other: &ObjectWatcher) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ===== Identity map =====

    /// Register `obj` as the canonical instance for its (kind, id)
    ///
    /// Registering the instance that is already mapped is a no-op.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `obj` is transient
    /// - `DuplicateIdentity` when another instance holds the key
    pub fn add_to_map<T: DomainObject>(&self, obj: &Rc<RefCell<T>>) -> Result<()> {
        let (key, identity) = {
            let borrowed = obj.borrow();
            if borrowed.is_transient() {
                return Err(MapError::Unsaved { entity: T::KIND }.into());
            }
            (borrowed.key(), borrowed.identity())
        };

        let mut map = self.inner.map.borrow_mut();
        if let Some(existing) = map.get(&key) {
            let same = Rc::clone(existing)
                .downcast::<RefCell<T>>()
                .map(|existing| Rc::ptr_eq(&existing, obj))
                .unwrap_or(false);
            if same {
                return Ok(());
            }
            return Err(ExError::from(MapError::DuplicateIdentity {
                entity: key.kind,
                id: key.id,
            })
            .with_session_id(self.inner.session_id.clone()));
        }

        let erased: Rc<dyn Any> = obj.clone();
        map.insert(key, erased);
        self.inner.snapshots.borrow_mut().insert(key, identity);
        tracing::debug!(session_id = %self.inner.session_id, key = %key, "mapped");
        Ok(())
    }

    /// Canonical instance for (T, id), if one is registered; never constructs
    pub fn get_from_map<T: DomainObject>(&self, id: i64) -> Option<Rc<RefCell<T>>> {
        let key = EntityKey::new(T::KIND, id);
        let erased = self.inner.map.borrow().get(&key).cloned()?;
        erased.downcast::<RefCell<T>>().ok()
    }

    /// Forget the instance for (T, id), returning it
    pub fn remove_from_map<T: DomainObject>(&self, id: i64) -> Option<Rc<RefCell<T>>> {
        let key = EntityKey::new(T::KIND, id);
        self.inner.snapshots.borrow_mut().remove(&key);
        let erased = self.inner.map.borrow_mut().remove(&key)?;
        erased.downcast::<RefCell<T>>().ok()
    }

    pub fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.inner
            .map
            .borrow()
            .contains_key(&EntityKey::new(kind, id))
    }

    /// Number of mapped instances
    pub fn len(&self) -> usize {
        self.inner.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.map.borrow().is_empty()
    }

    // ===== Dirty checking =====

    /// Record `obj`'s current state as its persisted state
    pub fn mark_clean<T: DomainObject>(&self, obj: &Rc<RefCell<T>>) {
        let borrowed = obj.borrow();
        if borrowed.is_transient() {
            return;
        }
        self.inner
            .snapshots
            .borrow_mut()
            .insert(borrowed.key(), borrowed.identity());
    }

    /// Persisted-state snapshot for (T, id)
    pub fn snapshot<T: DomainObject>(&self, id: i64) -> Option<IdentityObject> {
        self.inner
            .snapshots
            .borrow()
            .get(&EntityKey::new(T::KIND, id))
            .cloned()
    }

    /// Fields changed since the last snapshot, `None` when there is none
    pub fn changed_fields<T: DomainObject>(&self, obj: &Rc<RefCell<T>>) -> Option<Vec<&'static str>> {
        let borrowed = obj.borrow();
        let snapshot = self.snapshot::<T>(borrowed.id())?;
        Some(snapshot.changed_fields(&borrowed.identity()))
    }

    /// True when `obj` differs from its snapshot or has none
    pub fn is_dirty<T: DomainObject>(&self, obj: &Rc<RefCell<T>>) -> bool {
        self.changed_fields(obj)
            .map_or(true, |changed| !changed.is_empty())
    }

    // ===== Unit of work =====

    /// Queue a write to run at the next flush
    ///
    /// The task stays owned by this watcher until it is flushed or the
    /// watcher is reset.
    pub fn queue_operation(&self, key: EntityKey, kind: OperationKind, task: WriteTask) {
        tracing::debug!(session_id = %self.inner.session_id, op = %kind, key = %key, "queued");
        self.inner
            .queue
            .borrow_mut()
            .push_back(Operation::Write { kind, key, task });
    }

    /// Queue a deferred collection load to run at the next flush
    pub fn queue_load(&self, pending: Rc<dyn PendingLoad>) {
        tracing::debug!(
            session_id = %self.inner.session_id,
            relation = %pending.relation(),
            owner_id = pending.owner_id(),
            "load queued"
        );
        self.inner
            .queue
            .borrow_mut()
            .push_back(Operation::Load(pending));
    }

    /// Remember a collection so `reset` can unload it
    pub(crate) fn track_collection(&self, collection: Weak<dyn PendingLoad>) {
        let mut tracked = self.inner.collections.borrow_mut();
        tracked.retain(|c| c.strong_count() > 0);
        tracked.push(collection);
    }

    pub fn pending_operations(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Labels of queued operations, in queue order
    pub fn pending_labels(&self) -> Vec<String> {
        self.inner.queue.borrow().iter().map(Operation::label).collect()
    }

    /// Execute queued operations in FIFO order until the queue is empty
    ///
    /// Adjacent loads of the same relation are resolved with one batched
    /// fetch. Operations queued while flushing run in the same flush.
    ///
    /// # Errors
    ///
    /// Returns a `Flush` error when an operation fails. Operations applied
    /// before it stay applied and are listed in the error; the failed
    /// operation and everything after it remain queued.
    pub fn perform_operations(&self) -> Result<FlushSummary> {
        let queued = self.pending_operations();
        log_op_start!(
            "perform_operations",
            session_id = %self.inner.session_id,
            queue_len = queued as u64
        );
        let start = Instant::now();

        let mut summary = FlushSummary::default();
        let outcome = self.drain(&mut summary);

        match outcome {
            Ok(()) => {
                log_op_end!(
                    "perform_operations",
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = %self.inner.session_id,
                    applied = summary.applied.len() as u64
                );
                Ok(summary)
            }
            Err((failed, err)) => {
                let flush_err = ExError::new(ExErrorKind::Flush)
                    .with_op("perform_operations")
                    .with_session_id(self.inner.session_id.clone())
                    .with_message(format!(
                        "flush stopped after {} applied operations",
                        summary.applied.len()
                    ))
                    .with_failed_op(failed)
                    .with_applied(summary.applied)
                    .with_remaining(self.pending_operations())
                    .with_source(err);
                log_op_error!(
                    "perform_operations",
                    flush_err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = %self.inner.session_id
                );
                Err(flush_err)
            }
        }
    }

    fn drain(&self, summary: &mut FlushSummary) -> std::result::Result<(), (String, ExError)> {
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(op) = next else {
                return Ok(());
            };

            match op {
                Operation::Load(first) => {
                    let batch = self.take_load_batch(first);
                    // the batch leader's loader serves every member
                    if let Err(err) = batch[0].resolve_batch(self, &batch) {
                        let failed = load_label(batch[0].relation(), batch[0].owner_id());
                        self.requeue_front(batch.into_iter().map(Operation::Load).collect());
                        return Err((failed, err));
                    }
                    summary.load_batches += 1;
                    summary.applied.extend(
                        batch
                            .iter()
                            .map(|p| load_label(p.relation(), p.owner_id())),
                    );
                }
                Operation::Write {
                    kind,
                    key,
                    mut task,
                } => {
                    if let Err(err) = task() {
                        self.requeue_front(vec![Operation::Write { kind, key, task }]);
                        return Err((format!("{}:{}", kind, key), err));
                    }
                    summary.applied.push(format!("{}:{}", kind, key));
                }
            }
        }
    }

    /// Pop the run of loads directly behind `first` that share its relation
    fn take_load_batch(&self, first: Rc<dyn PendingLoad>) -> Vec<Rc<dyn PendingLoad>> {
        let relation = first.relation();
        let mut batch = vec![first];
        let mut queue = self.inner.queue.borrow_mut();
        while let Some(Operation::Load(next)) = queue.front() {
            if next.relation() != relation {
                break;
            }
            if let Some(Operation::Load(next)) = queue.pop_front() {
                batch.push(next);
            }
        }
        batch
    }

    fn requeue_front(&self, ops: Vec<Operation>) {
        let mut queue = self.inner.queue.borrow_mut();
        for op in ops.into_iter().rev() {
            queue.push_front(op);
        }
    }

    /// Drop every mapped instance and queued operation
    ///
    /// Every collection created in this session falls back to unloaded, so
    /// the next access queues a fresh load. This also releases the
    /// owner/member reference cycles loaded collections form, and the
    /// watcher/mapper cycle of queued writes.
    pub fn reset(&self) {
        let dropped: Vec<Operation> = self.inner.queue.borrow_mut().drain(..).collect();
        let collections: Vec<Rc<dyn PendingLoad>> = self
            .inner
            .collections
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for collection in &collections {
            collection.unload();
        }
        let mapped = {
            let mut map = self.inner.map.borrow_mut();
            let n = map.len();
            map.clear();
            n
        };
        self.inner.snapshots.borrow_mut().clear();
        tracing::debug!(
            session_id = %self.inner.session_id,
            mapped,
            dropped_ops = dropped.len(),
            "identity map reset"
        );
        // queued closures may hold the last handles to mapped objects; drop
        // them only after the map borrow is released
        drop(dropped);
    }
}
