// crates/stackscope-graph/src/collection.rs
// ============================================================================
// Module: Collections
// Description: Insertion-ordered entity collections with named indexes.
// Purpose: Back one-to-many edges with membership events, multi-index
//          lookup, and reactive re-bucketing.
// Dependencies: stackscope-reactive, indexmap, rustc-hash, serde_json,
//               crate::store
// ============================================================================

//! ## Overview
//! A [`Collection`] is one insertion-ordered member set plus any number of
//! named indexes. An index maps a projection key to the bucket of members
//! currently carrying that key. Projections that read signals are reactive:
//! a per-item effect re-buckets the item when the projected signal changes,
//! removing it from the old bucket before inserting it into the new one
//! within the same turn.
//!
//! Invariants:
//! - Collection membership equals the union of any one index's buckets.
//! - After a reactive re-key, the item is present in exactly the bucket for
//!   the new key.
//! - `ids` returns a snapshot: items added after the call are not seen,
//!   items removed after the call resolve to nothing and are skipped by
//!   callers.

use std::cell::RefCell;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::rc::Rc;
use std::rc::Weak;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use rustc_hash::FxHasher;
use serde_json::Value;
use stackscope_reactive::Effect;
use stackscope_reactive::Signal;
use stackscope_reactive::detached;

use crate::entity::EdgeKind;
use crate::entity::EntityId;
use crate::entity::Node;
use crate::error::GraphError;
use crate::store::Store;
use crate::store::StoreInner;
use crate::view::FilteredView;

/// Insertion-ordered set keyed with the fast non-cryptographic hasher.
pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Hashable index key projected from an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Integer key.
    Int(i64),
    /// String key.
    Str(String),
    /// Boolean key.
    Bool(bool),
}

impl IndexKey {
    /// Converts a JSON scalar into an index key.
    ///
    /// Returns `None` for nulls, floats without integer value, arrays, and
    /// objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Int),
            Value::String(text) => Some(Self::Str(text.clone())),
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for IndexKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => value.fmt(f),
            Self::Str(value) => f.write_str(value),
            Self::Bool(value) => value.fmt(f),
        }
    }
}

/// Membership change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvent {
    /// An entity joined the collection.
    Added(EntityId),
    /// An entity left the collection.
    Removed(EntityId),
}

/// One named index over a collection.
pub(crate) struct IndexEntry {
    /// Index name, unique within the collection.
    name: &'static str,
    /// Key projection. Signal reads inside make the index reactive.
    project: Rc<dyn Fn(&Rc<dyn Node>) -> Option<IndexKey>>,
    /// Key to bucket map.
    buckets: RefCell<FxHashMap<IndexKey, FxIndexSet<EntityId>>>,
    /// Current key of each bucketed member.
    item_keys: RefCell<FxHashMap<EntityId, IndexKey>>,
}

impl IndexEntry {
    /// Removes `id` from its current bucket, if any.
    fn unbucket(&self, id: EntityId) {
        if let Some(key) = self.item_keys.borrow_mut().remove(&id) {
            let mut buckets = self.buckets.borrow_mut();
            let emptied = if let Some(bucket) = buckets.get_mut(&key) {
                bucket.shift_remove(&id);
                bucket.is_empty()
            } else {
                false
            };
            if emptied {
                buckets.remove(&key);
            }
        }
    }

    /// Moves `id` into the bucket for `key`, leaving its old bucket first.
    ///
    /// Returns true if the bucketing changed.
    fn rebucket(&self, id: EntityId, key: Option<IndexKey>) -> bool {
        if self.item_keys.borrow().get(&id) == key.as_ref() {
            return false;
        }
        self.unbucket(id);
        if let Some(key) = key {
            self.buckets
                .borrow_mut()
                .entry(key.clone())
                .or_default()
                .insert(id);
            self.item_keys.borrow_mut().insert(id, key);
        }
        true
    }
}

/// Shared state backing one collection.
pub(crate) struct CollectionInner {
    /// Edge name, lowercase plural.
    name: &'static str,
    /// Propagation mode of the backing edge.
    kind: EdgeKind,
    /// Entity owning this collection as an outgoing edge, if any.
    owner: Option<EntityId>,
    /// Store used to resolve members for projections.
    store: Weak<StoreInner>,
    /// Members in insertion order.
    members: RefCell<FxIndexSet<EntityId>>,
    /// Declared indexes.
    indexes: RefCell<Vec<IndexEntry>>,
    /// Per-member re-bucketing effects, one per index.
    watchers: RefCell<FxHashMap<EntityId, Vec<Effect>>>,
    /// Bumped on every membership or bucketing change.
    revision: Signal<u64>,
    /// Synchronous membership listeners.
    listeners: RefCell<Vec<Box<dyn Fn(&CollectionEvent)>>>,
}

impl CollectionInner {
    /// Bumps the revision signal, waking dependent queries and rollups.
    fn touch(&self) {
        self.revision.update(|revision| *revision += 1);
    }

    /// Runs the projection for one member of one index and re-buckets.
    ///
    /// This is the body of the per-member watcher effect; signal reads in
    /// the projection register the effect for re-runs.
    fn project_member(&self, index_position: usize, id: EntityId) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let Some(node) = store.entity(id) else {
            return;
        };
        let changed = {
            let indexes = self.indexes.borrow();
            let Some(index) = indexes.get(index_position) else {
                return;
            };
            let key = (index.project)(&node);
            index.rebucket(id, key)
        };
        if changed {
            self.touch();
        }
    }

    /// Removes a member and tears down its index state and watchers.
    ///
    /// Shared by `unlink` and by store-driven disposal.
    pub(crate) fn remove_member(&self, id: EntityId) -> bool {
        if !self.members.borrow_mut().shift_remove(&id) {
            return false;
        }
        if let Some(watchers) = self.watchers.borrow_mut().remove(&id) {
            for watcher in watchers {
                watcher.dispose();
            }
        }
        for index in self.indexes.borrow().iter() {
            index.unbucket(id);
        }
        self.touch();
        self.emit(&CollectionEvent::Removed(id));
        true
    }

    /// Invokes membership listeners.
    fn emit(&self, event: &CollectionEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }

    /// Disposes watcher effects and unregisters surviving members.
    ///
    /// Called by the store when the owning entity is disposed.
    pub(crate) fn teardown(&self, store: &StoreInner) {
        let members: Vec<EntityId> = self.members.borrow().iter().copied().collect();
        for id in members {
            store.unregister_membership(id, self);
        }
        let watchers = std::mem::take(&mut *self.watchers.borrow_mut());
        for (_, effects) in watchers {
            for effect in effects {
                effect.dispose();
            }
        }
        self.members.borrow_mut().clear();
        for index in self.indexes.borrow().iter() {
            index.buckets.borrow_mut().clear();
            index.item_keys.borrow_mut().clear();
        }
    }
}

/// Insertion-ordered, multi-indexed entity collection.
///
/// Handles are cheap clones sharing the same membership.
#[derive(Clone)]
pub struct Collection {
    /// Shared collection state.
    inner: Rc<CollectionInner>,
}

impl Collection {
    /// Creates an empty collection backing an edge of `owner`.
    #[must_use]
    pub fn new(store: &Store, name: &'static str, kind: EdgeKind, owner: Option<EntityId>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                name,
                kind,
                owner,
                store: store.downgrade(),
                members: RefCell::new(FxIndexSet::default()),
                indexes: RefCell::new(Vec::new()),
                watchers: RefCell::new(FxHashMap::default()),
                revision: Signal::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Declares an index keyed by `project`.
    ///
    /// Declared at schema time, before members are inserted. Projections
    /// that read signals make the index reactive.
    #[must_use]
    pub fn with_index(
        self,
        name: &'static str,
        project: impl Fn(&Rc<dyn Node>) -> Option<IndexKey> + 'static,
    ) -> Self {
        self.inner.indexes.borrow_mut().push(IndexEntry {
            name,
            project: Rc::new(project),
            buckets: RefCell::new(FxHashMap::default()),
            item_keys: RefCell::new(FxHashMap::default()),
        });
        self
    }

    /// Returns the edge name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the propagation mode of the backing edge.
    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        self.inner.kind
    }

    /// Returns true if the collection declares an index named `name`.
    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.inner
            .indexes
            .borrow()
            .iter()
            .any(|index| index.name == name)
    }

    /// Adds `id` to the collection.
    ///
    /// A no-op when already present. Registers membership with the store,
    /// records the strong-parent edge for owning collections, buckets the
    /// member under every index, and fires the add event.
    pub fn link(&self, id: EntityId) {
        if !self.inner.members.borrow_mut().insert(id) {
            return;
        }
        if let Some(store) = self.inner.store.upgrade() {
            store.register_membership(id, &self.inner);
            if self.inner.kind == EdgeKind::Strong {
                if let Some(owner) = self.inner.owner {
                    store.set_strong_parent(id, owner);
                }
            }
        }
        let index_count = self.inner.indexes.borrow().len();
        let mut watchers = Vec::with_capacity(index_count);
        for position in 0..index_count {
            let inner = Rc::downgrade(&self.inner);
            let watcher = detached(|| {
                Effect::new(move || {
                    if let Some(inner) = inner.upgrade() {
                        inner.project_member(position, id);
                    }
                })
            });
            watchers.push(watcher);
        }
        if !watchers.is_empty() {
            self.inner.watchers.borrow_mut().insert(id, watchers);
        }
        self.inner.touch();
        self.inner.emit(&CollectionEvent::Added(id));
    }

    /// Removes `id` without disposing it. Returns true if it was present.
    pub fn unlink(&self, id: EntityId) -> bool {
        let removed = self.inner.remove_member(id);
        if removed {
            if let Some(store) = self.inner.store.upgrade() {
                store.unregister_membership(id, &self.inner);
                if self.inner.kind == EdgeKind::Strong {
                    store.clear_strong_parent(id, self.inner.owner);
                }
            }
        }
        removed
    }

    /// Subscribes a synchronous membership listener.
    pub fn on_change(&self, listener: impl Fn(&CollectionEvent) + 'static) {
        self.inner.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Disposes watcher effects and unregisters surviving members.
    ///
    /// Called by the store when the owning entity is disposed.
    pub(crate) fn teardown(&self, store: &StoreInner) {
        self.inner.teardown(store);
    }

    /// Returns a membership snapshot under tracking.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        let _ = self.inner.revision.get();
        self.ids_untracked()
    }

    /// Returns a membership snapshot without tracking.
    #[must_use]
    pub fn ids_untracked(&self) -> Vec<EntityId> {
        self.inner.members.borrow().iter().copied().collect()
    }

    /// Returns the member count under tracking.
    #[must_use]
    pub fn len(&self) -> usize {
        let _ = self.inner.revision.get();
        self.inner.members.borrow().len()
    }

    /// Returns true when the collection has no members, under tracking.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` is a member, under tracking.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        let _ = self.inner.revision.get();
        self.inner.members.borrow().contains(&id)
    }

    /// Returns the member at `position` in insertion order, under tracking.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<EntityId> {
        let _ = self.inner.revision.get();
        self.inner.members.borrow().get_index(position).copied()
    }

    /// Returns the insertion position of `id`, without tracking.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.inner.members.borrow().get_index_of(&id)
    }

    /// Returns the first member in insertion order, under tracking.
    #[must_use]
    pub fn first(&self) -> Option<EntityId> {
        self.get(0)
    }

    /// Returns the last member in insertion order, under tracking.
    #[must_use]
    pub fn last(&self) -> Option<EntityId> {
        let _ = self.inner.revision.get();
        self.inner.members.borrow().last().copied()
    }

    /// Returns the bucket for `key` under index `index`, under tracking.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownIndex`] when no such index is declared.
    pub fn by(&self, index: &str, key: &IndexKey) -> Result<Vec<EntityId>, GraphError> {
        let _ = self.inner.revision.get();
        let indexes = self.inner.indexes.borrow();
        let entry = indexes
            .iter()
            .find(|candidate| candidate.name == index)
            .ok_or_else(|| GraphError::UnknownIndex {
                collection: self.inner.name,
                index: index.to_owned(),
            })?;
        let result = entry
            .buckets
            .borrow()
            .get(key)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        Ok(result)
    }

    /// Returns a filtered view of the members bucketed under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownIndex`] when no such index is declared.
    pub fn filtered(&self, index: &'static str, key: IndexKey) -> Result<FilteredView, GraphError> {
        if !self.has_index(index) {
            return Err(GraphError::UnknownIndex {
                collection: self.inner.name,
                index: index.to_owned(),
            });
        }
        Ok(FilteredView::new(self.clone(), index, key))
    }

    /// Returns the revision signal for rollup derivations.
    #[must_use]
    pub fn revision(&self) -> &Signal<u64> {
        &self.inner.revision
    }

    /// Resolves a member through the store, skipping disposed entities.
    #[must_use]
    pub fn resolve(&self, id: EntityId) -> Option<Rc<dyn Node>> {
        self.inner.store.upgrade().and_then(|store| store.entity(id))
    }

    /// Returns a handle to the backing store, while the graph is alive.
    #[must_use]
    pub fn store_handle(&self) -> Option<Store> {
        self.inner.store.upgrade().map(Store::from_inner)
    }
}
