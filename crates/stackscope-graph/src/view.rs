// crates/stackscope-graph/src/view.rs
// ============================================================================
// Module: Filtered Views
// Description: Lazy subcollection restricted to one index bucket.
// Purpose: Expose a collection's members matching a fixed key, with the
//          parent's other indexes restricted to those members.
// Dependencies: crate::collection
// ============================================================================

//! ## Overview
//! A [`FilteredView`] does not duplicate membership. It reads the defining
//! bucket of its parent collection lazily, so a member added to the parent
//! that matches the key appears in the view at the next observation point,
//! and a member re-keyed away disappears the same way.
//!
//! Invariants:
//! - View iteration order is the parent's bucket order.
//! - Cross-index queries through the view never return an entity outside
//!   the defining bucket.

use crate::collection::Collection;
use crate::collection::IndexKey;
use crate::entity::EntityId;
use crate::error::GraphError;

/// Lazy view of one index bucket of a collection.
#[derive(Clone)]
pub struct FilteredView {
    /// Parent collection.
    parent: Collection,
    /// Defining index name.
    index: &'static str,
    /// Defining key.
    key: IndexKey,
}

impl FilteredView {
    /// Creates a view over `parent` restricted to `index == key`.
    pub(crate) fn new(parent: Collection, index: &'static str, key: IndexKey) -> Self {
        Self { parent, index, key }
    }

    /// Returns the members currently in the defining bucket, under tracking.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.parent.by(self.index, &self.key).unwrap_or_default()
    }

    /// Returns the view size under tracking.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// Returns true when the defining bucket is empty, under tracking.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Returns true if `id` is in the defining bucket, under tracking.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.ids().contains(&id)
    }

    /// Returns the first member of the defining bucket, under tracking.
    #[must_use]
    pub fn first(&self) -> Option<EntityId> {
        self.ids().first().copied()
    }

    /// Queries another parent index, restricted to this view's members.
    ///
    /// The result preserves the defining bucket's order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownIndex`] when the parent does not declare
    /// `index`.
    pub fn by(&self, index: &str, key: &IndexKey) -> Result<Vec<EntityId>, GraphError> {
        let other = self.parent.by(index, key)?;
        Ok(self
            .ids()
            .into_iter()
            .filter(|id| other.contains(id))
            .collect())
    }
}
