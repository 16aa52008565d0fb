// crates/stackscope-graph/src/edge.rs
// ============================================================================
// Module: One-to-One Edges
// Description: Signal-backed single-target edge slot.
// Purpose: Hold at most one entity reference with occupancy checking and
//          automatic clearing when the target is disposed.
// Dependencies: stackscope-reactive, crate::store
// ============================================================================

//! ## Overview
//! An [`EdgeSlot`] is a one-to-one edge: a signal holding an optional target
//! id. Linking an occupied slot fails; the store clears slots whose target
//! is disposed so no dangling references survive a deletion.
//!
//! Invariants:
//! - A slot never points at an entity that has been removed from the store.
//! - Occupancy errors leave the slot unchanged.

use std::rc::Rc;
use std::rc::Weak;

use stackscope_reactive::Signal;

use crate::entity::EdgeKind;
use crate::entity::EntityId;
use crate::error::GraphError;
use crate::store::Store;
use crate::store::StoreInner;

/// Shared state backing one slot.
pub(crate) struct SlotInner {
    /// Edge name, lowercase singular.
    pub(crate) name: &'static str,
    /// Propagation mode.
    pub(crate) kind: EdgeKind,
    /// Current target.
    pub(crate) target: Signal<Option<EntityId>>,
    /// Store the slot registers its back-reference with.
    pub(crate) store: Weak<StoreInner>,
}

/// Signal-backed one-to-one edge.
#[derive(Clone)]
pub struct EdgeSlot {
    /// Shared slot state.
    inner: Rc<SlotInner>,
}

impl EdgeSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new(store: &Store, name: &'static str, kind: EdgeKind) -> Self {
        Self {
            inner: Rc::new(SlotInner {
                name,
                kind,
                target: Signal::new(None),
                store: store.downgrade(),
            }),
        }
    }

    /// Returns the edge name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the propagation mode.
    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        self.inner.kind
    }

    /// Reads the target under tracking.
    #[must_use]
    pub fn get(&self) -> Option<EntityId> {
        self.inner.target.get()
    }

    /// Reads the target without tracking.
    #[must_use]
    pub fn get_untracked(&self) -> Option<EntityId> {
        self.inner.target.get_untracked()
    }

    /// Links the slot to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeOccupied`] when the slot already holds a
    /// different target.
    pub fn link(&self, target: EntityId) -> Result<(), GraphError> {
        match self.inner.target.get_untracked() {
            Some(existing) if existing == target => Ok(()),
            Some(_) => Err(GraphError::EdgeOccupied {
                edge: self.inner.name,
            }),
            None => {
                if let Some(store) = self.inner.store.upgrade() {
                    store.register_slot(target, &self.inner);
                }
                self.inner.target.set(Some(target));
                Ok(())
            }
        }
    }

    /// Clears the slot. A no-op when already empty.
    pub fn unlink(&self) {
        if let Some(previous) = self.inner.target.get_untracked() {
            if let Some(store) = self.inner.store.upgrade() {
                store.unregister_slot(previous, &self.inner);
            }
            self.inner.target.set(None);
        }
    }

    /// Replaces the target unconditionally, clearing any previous link.
    pub fn relink(&self, target: EntityId) {
        self.unlink();
        // The slot is empty now, so linking cannot fail.
        let _ = self.link(target);
    }

}

impl SlotInner {
    /// Clears the slot without touching the back-reference registry.
    ///
    /// Called by the store while it is already scrubbing the registry for a
    /// disposed target.
    pub(crate) fn clear_for_disposal(&self) {
        self.target.set(None);
    }
}
