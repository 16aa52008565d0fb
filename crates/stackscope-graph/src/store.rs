// crates/stackscope-graph/src/store.rs
// ============================================================================
// Module: Entity Store
// Description: Arena of entities with lifecycle propagation and registries.
// Purpose: Register entities by stable identity, derive URIs, and propagate
//          staleness and disposal along typed edges.
// Dependencies: stackscope-reactive, slotmap, indexmap, rustc-hash,
//               crate::{collection, edge, entity}
// ============================================================================

//! ## Overview
//! The store owns every entity behind `Rc<dyn Node>` and keeps three
//! registries that make propagation generic: which collections contain each
//! entity, which one-to-one slots point at each entity, and each entity's
//! strong parent. Disposal walks strong edges only; staleness walks strong
//! and lifecycle edges.
//!
//! Invariants:
//! - Disposal marks the whole strong subtree `alive=false` in one turn,
//!   children before parents in the marking order, before any removal event
//!   fires.
//! - After disposal, no collection and no index bucket contains the entity,
//!   and every slot that pointed at it is cleared.
//! - Double delete and repeated stale-marking are no-ops.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::rc::Weak;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;
use slotmap::SlotMap;
use stackscope_reactive::batch;
use stackscope_reactive::detached;

use crate::collection::CollectionInner;
use crate::collection::FxIndexSet;
use crate::edge::SlotInner;
use crate::entity::EdgeHandle;
use crate::entity::EdgeKind;
use crate::entity::EntityId;
use crate::entity::Node;

/// Arena and registries shared by all graph handles.
pub(crate) struct StoreInner {
    /// Entity arena.
    entities: RefCell<SlotMap<EntityId, Rc<dyn Node>>>,
    /// Entities grouped by kind label, in creation order.
    by_kind: RefCell<FxHashMap<&'static str, FxIndexSet<EntityId>>>,
    /// Monotonic creation serial per entity, for history ordering.
    serials: RefCell<SecondaryMap<EntityId, u64>>,
    /// Next creation serial.
    next_serial: Cell<u64>,
    /// Collections currently containing each entity.
    memberships: RefCell<SecondaryMap<EntityId, Vec<Weak<CollectionInner>>>>,
    /// One-to-one slots currently pointing at each entity.
    slot_refs: RefCell<SecondaryMap<EntityId, Vec<Weak<SlotInner>>>>,
    /// Strong parent of each entity, set by owning collections.
    strong_parents: RefCell<SecondaryMap<EntityId, EntityId>>,
}

impl StoreInner {
    /// Resolves an entity by id.
    pub(crate) fn entity(&self, id: EntityId) -> Option<Rc<dyn Node>> {
        self.entities.borrow().get(id).map(Rc::clone)
    }

    /// Records that `collection` now contains `id`.
    pub(crate) fn register_membership(&self, id: EntityId, collection: &Rc<CollectionInner>) {
        let mut memberships = self.memberships.borrow_mut();
        if let Some(entry) = memberships.entry(id) {
            entry.or_default().push(Rc::downgrade(collection));
        }
    }

    /// Records that `collection` no longer contains `id`.
    pub(crate) fn unregister_membership(&self, id: EntityId, collection: &CollectionInner) {
        if let Some(list) = self.memberships.borrow_mut().get_mut(id) {
            list.retain(|weak| !std::ptr::eq(weak.as_ptr(), collection));
        }
    }

    /// Records that `slot` now points at `id`.
    pub(crate) fn register_slot(&self, id: EntityId, slot: &Rc<SlotInner>) {
        let mut slot_refs = self.slot_refs.borrow_mut();
        if let Some(entry) = slot_refs.entry(id) {
            entry.or_default().push(Rc::downgrade(slot));
        }
    }

    /// Records that `slot` no longer points at `id`.
    pub(crate) fn unregister_slot(&self, id: EntityId, slot: &Rc<SlotInner>) {
        if let Some(list) = self.slot_refs.borrow_mut().get_mut(id) {
            list.retain(|weak| !std::ptr::eq(weak.as_ptr(), Rc::as_ptr(slot)));
        }
    }

    /// Records the owning edge of `id`.
    pub(crate) fn set_strong_parent(&self, id: EntityId, parent: EntityId) {
        self.strong_parents.borrow_mut().insert(id, parent);
    }

    /// Clears the owning edge of `id` if it matches `owner`.
    pub(crate) fn clear_strong_parent(&self, id: EntityId, owner: Option<EntityId>) {
        let mut parents = self.strong_parents.borrow_mut();
        match (parents.get(id).copied(), owner) {
            (Some(current), Some(owner)) if current == owner => {
                parents.remove(id);
            }
            (Some(_), None) => {
                parents.remove(id);
            }
            _ => {}
        }
    }
}

/// Handle to the entity graph.
///
/// Handles are cheap clones sharing one arena.
#[derive(Clone)]
pub struct Store {
    /// Shared arena and registries.
    inner: Rc<StoreInner>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                entities: RefCell::new(SlotMap::with_key()),
                by_kind: RefCell::new(FxHashMap::default()),
                serials: RefCell::new(SecondaryMap::new()),
                next_serial: Cell::new(0),
                memberships: RefCell::new(SecondaryMap::new()),
                slot_refs: RefCell::new(SecondaryMap::new()),
                strong_parents: RefCell::new(SecondaryMap::new()),
            }),
        }
    }

    /// Returns a weak handle for registries held inside entities.
    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Rc::downgrade(&self.inner)
    }

    /// Rebuilds a handle from the shared arena.
    pub(crate) fn from_inner(inner: Rc<StoreInner>) -> Self {
        Self { inner }
    }

    /// Creates an entity through `build` and registers it.
    ///
    /// `build` receives the assigned id and constructs the entity, its
    /// signals, and its edges. Construction runs detached from any current
    /// reactive scope: the entity's own scope governs its registrations.
    /// Edges must be linked after `insert` returns; the arena is locked
    /// while `build` runs.
    pub fn insert<T: Node>(&self, build: impl FnOnce(EntityId) -> Rc<T>) -> Rc<T> {
        let mut created: Option<Rc<T>> = None;
        let id = {
            let slot = &mut created;
            self.inner.entities.borrow_mut().insert_with_key(|id| {
                let entity = detached(|| build(id));
                *slot = Some(Rc::clone(&entity));
                entity as Rc<dyn Node>
            })
        };
        let serial = self.inner.next_serial.get();
        self.inner.next_serial.set(serial + 1);
        self.inner.serials.borrow_mut().insert(id, serial);
        let entity = match created {
            Some(entity) => entity,
            // insert_with_key always runs the closure.
            None => unreachable!(),
        };
        self.inner
            .by_kind
            .borrow_mut()
            .entry(entity.kind())
            .or_default()
            .insert(id);
        entity
    }

    /// Resolves an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Rc<dyn Node>> {
        self.inner.entity(id)
    }

    /// Resolves an entity by id with its concrete type.
    #[must_use]
    pub fn get_as<T: Node>(&self, id: EntityId) -> Option<Rc<T>> {
        self.inner.entity(id)?.as_any().downcast::<T>().ok()
    }

    /// Returns true if `id` is present in the arena.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.inner.entities.borrow().contains_key(id)
    }

    /// Returns the creation serial of `id`, for history ordering.
    #[must_use]
    pub fn serial(&self, id: EntityId) -> Option<u64> {
        self.inner.serials.borrow().get(id).copied()
    }

    /// Returns all live entities of `kind` in creation order.
    #[must_use]
    pub fn of_kind(&self, kind: &str) -> Vec<EntityId> {
        self.inner
            .by_kind
            .borrow()
            .get(kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the strong parent of `id`, if linked.
    #[must_use]
    pub fn strong_parent(&self, id: EntityId) -> Option<EntityId> {
        self.inner.strong_parents.borrow().get(id).copied()
    }

    /// Derives the canonical URI of `id` by walking strong parents to the
    /// root.
    ///
    /// Returns `None` when the entity or one of its ancestors is gone.
    #[must_use]
    pub fn uri_of(&self, id: EntityId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = id;
        loop {
            let Some(parent) = self.strong_parent(cursor) else {
                break;
            };
            let parent_node = self.get(parent)?;
            let segment = parent_node.edges().into_iter().find_map(|edge| {
                if edge.kind() != EdgeKind::Strong {
                    return None;
                }
                match &edge {
                    EdgeHandle::Many(collection) => collection
                        .position_of(cursor)
                        .map(|position| format!("{}[{position}]", edge.name())),
                    EdgeHandle::One(slot) => {
                        (slot.get_untracked() == Some(cursor)).then(|| edge.name().to_owned())
                    }
                }
            })?;
            segments.push(segment);
            cursor = parent;
        }
        segments.reverse();
        let mut uri = String::new();
        for segment in segments {
            uri.push('/');
            uri.push_str(&segment);
        }
        if uri.is_empty() {
            uri.push('/');
        }
        Some(uri)
    }

    /// Marks `id` and its strong- and lifecycle-reachable descendants stale.
    ///
    /// Atomic within one turn; idempotent; never disposes.
    pub fn mark_stale(&self, id: EntityId) {
        let mut reachable = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_reachable(
            id,
            &[EdgeKind::Strong, EdgeKind::Lifecycle],
            &mut visited,
            &mut reachable,
        );
        batch(|| {
            for target in &reachable {
                if let Some(node) = self.get(*target) {
                    node.lifecycle().set_stale();
                }
            }
        });
    }

    /// Deletes `id` and its strong-reachable descendants.
    ///
    /// The whole subtree is marked `alive=false` in one turn before any
    /// unlinking, so observers never see a live parent with dead strong
    /// children. Removal events and registry scrubbing follow, children
    /// first. Double delete is a no-op.
    pub fn delete(&self, id: EntityId) {
        if !self.contains(id) {
            return;
        }
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_post_order(id, &mut visited, &mut order);
        tracing::trace!(
            target: "stackscope::graph",
            entities = order.len(),
            "disposing strong subtree"
        );
        batch(|| {
            for target in &order {
                if let Some(node) = self.get(*target) {
                    node.lifecycle().set_dead();
                }
            }
        });
        for target in order {
            self.dispose_one(target);
        }
    }

    /// Collects entities reachable over `kinds` edges, including `id`.
    fn collect_reachable(
        &self,
        id: EntityId,
        kinds: &[EdgeKind],
        visited: &mut FxHashSet<EntityId>,
        out: &mut Vec<EntityId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        out.push(id);
        let Some(node) = self.get(id) else {
            return;
        };
        for edge in node.edges() {
            if !kinds.contains(&edge.kind()) {
                continue;
            }
            for target in edge.target_ids() {
                self.collect_reachable(target, kinds, visited, out);
            }
        }
    }

    /// Collects the strong subtree of `id` in children-first order.
    fn collect_post_order(
        &self,
        id: EntityId,
        visited: &mut FxHashSet<EntityId>,
        out: &mut Vec<EntityId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        if let Some(node) = self.get(id) {
            for edge in node.edges() {
                if edge.kind() != EdgeKind::Strong {
                    continue;
                }
                for target in edge.target_ids() {
                    self.collect_post_order(target, visited, out);
                }
            }
        }
        out.push(id);
    }

    /// Unlinks one already-dead entity from every registry and disposes it.
    fn dispose_one(&self, id: EntityId) {
        let Some(node) = self.get(id) else {
            return;
        };
        // Collections that contain the entity drop it, firing remove events.
        let containing = self
            .inner
            .memberships
            .borrow_mut()
            .remove(id)
            .unwrap_or_default();
        for weak in containing {
            if let Some(collection) = weak.upgrade() {
                collection.remove_member(id);
            }
        }
        // Slots pointing at the entity are cleared.
        let pointing = self
            .inner
            .slot_refs
            .borrow_mut()
            .remove(id)
            .unwrap_or_default();
        for weak in pointing {
            if let Some(slot) = weak.upgrade() {
                slot.clear_for_disposal();
            }
        }
        // The entity's own edges release their registrations.
        for edge in node.edges() {
            match edge {
                EdgeHandle::Many(collection) => collection.teardown(&self.inner),
                EdgeHandle::One(slot) => slot.unlink(),
            }
        }
        self.inner.strong_parents.borrow_mut().remove(id);
        if let Some(set) = self.inner.by_kind.borrow_mut().get_mut(node.kind()) {
            set.shift_remove(&id);
        }
        self.inner.serials.borrow_mut().remove(id);
        self.inner.entities.borrow_mut().remove(id);
        node.scope().dispose();
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
