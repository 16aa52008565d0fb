// crates/stackscope-graph/src/rollup.rs
// ============================================================================
// Module: Rollups
// Description: Derived signals computed from collection edges.
// Purpose: Provide count, presence, pick, and property aggregations that
//          track both membership and member signals.
// Dependencies: stackscope-reactive, crate::collection
// ============================================================================

//! ## Overview
//! A rollup is a [`Memo`] derived from a collection. Every rollup tracks the
//! collection revision, so membership changes re-derive it; predicates and
//! projections that read member signals additionally re-derive on those
//! signal changes.
//!
//! Invariants:
//! - At every observation point a count rollup equals the cardinality of
//!   the predicate-filtered membership.
//! - Pick rollups break ties by insertion order.

use std::rc::Rc;

use stackscope_reactive::Memo;

use crate::collection::Collection;
use crate::entity::EntityId;
use crate::entity::Node;

impl Collection {
    /// Rollup: member count.
    #[must_use]
    pub fn count(&self) -> Memo<usize> {
        let collection = self.clone();
        Memo::new(move || collection.len())
    }

    /// Rollup: count of members satisfying `pred`.
    ///
    /// The predicate may read member signals; the rollup re-derives when
    /// they change.
    #[must_use]
    pub fn count_where(&self, pred: impl Fn(&Rc<dyn Node>) -> bool + 'static) -> Memo<usize> {
        let collection = self.clone();
        Memo::new(move || {
            collection
                .ids()
                .into_iter()
                .filter_map(|id| collection.resolve(id))
                .filter(|node| pred(node))
                .count()
        })
    }

    /// Rollup: true when any member satisfies `pred`.
    #[must_use]
    pub fn any_where(&self, pred: impl Fn(&Rc<dyn Node>) -> bool + 'static) -> Memo<bool> {
        let collection = self.clone();
        Memo::new(move || {
            collection
                .ids()
                .into_iter()
                .filter_map(|id| collection.resolve(id))
                .any(|node| pred(&node))
        })
    }

    /// Rollup: first member satisfying `pred`, in insertion order.
    #[must_use]
    pub fn first_where(
        &self,
        pred: impl Fn(&Rc<dyn Node>) -> bool + 'static,
    ) -> Memo<Option<EntityId>> {
        let collection = self.clone();
        Memo::new(move || {
            collection
                .ids()
                .into_iter()
                .filter_map(|id| collection.resolve(id))
                .find(|node| pred(node))
                .map(|node| node.id())
        })
    }

    /// Rollup: sum of a numeric projection over the members.
    #[must_use]
    pub fn sum_by(&self, value: impl Fn(&Rc<dyn Node>) -> i64 + 'static) -> Memo<i64> {
        let collection = self.clone();
        Memo::new(move || {
            collection
                .ids()
                .into_iter()
                .filter_map(|id| collection.resolve(id))
                .map(|node| value(&node))
                .sum()
        })
    }

    /// Rollup: maximum of a numeric projection, `None` when empty.
    #[must_use]
    pub fn max_by(&self, value: impl Fn(&Rc<dyn Node>) -> i64 + 'static) -> Memo<Option<i64>> {
        let collection = self.clone();
        Memo::new(move || {
            collection
                .ids()
                .into_iter()
                .filter_map(|id| collection.resolve(id))
                .map(|node| value(&node))
                .max()
        })
    }
}
