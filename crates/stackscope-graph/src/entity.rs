// crates/stackscope-graph/src/entity.rs
// ============================================================================
// Module: Entity Model
// Description: Entity identity, lifecycle bits, edge kinds, and the
//              type-erased node interface.
// Purpose: Let the store, query engine, and propagation walks operate on any
//          entity type through one narrow surface.
// Dependencies: stackscope-reactive, slotmap, serde_json
// ============================================================================

//! ## Overview
//! Entities are identified by an arena key and accessed either through their
//! concrete type or through the [`Node`] trait. The trait exposes exactly
//! what generic machinery needs: the kind label, the lifecycle pair, named
//! fields as JSON values for filtering, and named edges for traversal.
//!
//! Invariants:
//! - `current` and `alive` are orthogonal: `current=false, alive=true` is a
//!   valid, queryable historical state.
//! - An entity's edges are declared once at construction and never change
//!   shape afterwards; only their targets change.

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;
use slotmap::new_key_type;
use stackscope_reactive::Scope;
use stackscope_reactive::Signal;

use crate::collection::Collection;
use crate::edge::EdgeSlot;

new_key_type! {
    /// Arena key identifying one entity. Stable across mutations, never
    /// exposed in URIs.
    pub struct EntityId;
}

/// Propagation mode of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Owning edge: disposal of the holder disposes the targets.
    Strong,
    /// Staleness edge: stale-marking the holder stale-marks the targets.
    Lifecycle,
    /// Reference edge: no propagation in either direction.
    Weak,
}

/// The two orthogonal lifecycle bits carried by every entity.
pub struct Lifecycle {
    /// Semantic freshness. Stale entities remain queryable.
    current: Signal<bool>,
    /// Presence in the graph. Dead entities are unlinked everywhere.
    alive: Signal<bool>,
}

impl Lifecycle {
    /// Creates a lifecycle pair in the fresh, live state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Signal::new(true),
            alive: Signal::new(true),
        }
    }

    /// Returns the freshness bit under tracking.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.current.get()
    }

    /// Returns the liveness bit under tracking.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Returns the freshness signal for derivations.
    #[must_use]
    pub fn current_signal(&self) -> &Signal<bool> {
        &self.current
    }

    /// Returns the liveness signal for derivations.
    #[must_use]
    pub fn alive_signal(&self) -> &Signal<bool> {
        &self.alive
    }

    /// Lowers the freshness bit. Idempotent.
    pub(crate) fn set_stale(&self) {
        self.current.set(false);
    }

    /// Lowers the liveness bit. Idempotent.
    pub(crate) fn set_dead(&self) {
        self.alive.set(false);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A named, type-erased view of one outgoing edge.
#[derive(Clone)]
pub enum EdgeHandle {
    /// One-to-one edge.
    One(EdgeSlot),
    /// One-to-many edge.
    Many(Collection),
}

impl EdgeHandle {
    /// Returns the edge name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::One(slot) => slot.name(),
            Self::Many(collection) => collection.name(),
        }
    }

    /// Returns the propagation mode.
    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::One(slot) => slot.kind(),
            Self::Many(collection) => collection.kind(),
        }
    }

    /// Returns the current targets without tracking.
    #[must_use]
    pub fn target_ids(&self) -> Vec<EntityId> {
        match self {
            Self::One(slot) => slot.get_untracked().into_iter().collect(),
            Self::Many(collection) => collection.ids_untracked(),
        }
    }
}

/// Type-erased entity interface.
///
/// Concrete entity types implement this once; the store, the lifecycle
/// propagator, and the query engine traverse the graph through it.
pub trait Node: 'static {
    /// Arena identity.
    fn id(&self) -> EntityId;

    /// Stable kind label, lowercase singular (for example `session`).
    fn kind(&self) -> &'static str;

    /// The lifecycle pair.
    fn lifecycle(&self) -> &Lifecycle;

    /// The reactive scope owning this entity's signals and effects.
    fn scope(&self) -> Scope;

    /// Reads a named field as a JSON value, for filter evaluation.
    ///
    /// Returns `None` for unknown field names. Reads are untracked; filter
    /// re-evaluation is driven by collection revisions.
    fn field(&self, name: &str) -> Option<Value>;

    /// All outgoing edges in declaration order.
    fn edges(&self) -> Vec<EdgeHandle>;

    /// Looks up one outgoing edge by name.
    fn edge(&self, name: &str) -> Option<EdgeHandle> {
        self.edges().into_iter().find(|edge| edge.name() == name)
    }

    /// Upcast for typed retrieval through [`Store::get_as`](crate::Store::get_as).
    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;
}
