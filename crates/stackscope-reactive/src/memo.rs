// crates/stackscope-reactive/src/memo.rs
// ============================================================================
// Module: Memo
// Description: Lazily recomputed derived signal.
// Purpose: Cache a tracked computation and re-derive it on demand after a
//          dependency change.
// Dependencies: crate::runtime
// ============================================================================

//! ## Overview
//! A [`Memo`] wraps a tracked computation. The value is computed on first
//! read and cached; a change in any dependency raises a staleness flag, and
//! the next read recomputes. Memos are themselves trackable, so effects and
//! other memos can depend on them.
//!
//! Invariants:
//! - A memo never recomputes while its staleness flag is down.
//! - Dependents of a memo are marked dirty when any of the memo's sources
//!   change, whether or not the memo has been re-read in between.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::NodeId;
use crate::runtime::NodeKind;
use crate::runtime::with_runtime;

/// Shared state backing one memo.
struct MemoInner<T> {
    /// Tracking identity in the runtime arena.
    node: NodeId,
    /// Cached value; `None` until the first read.
    value: RefCell<Option<T>>,
    /// The tracked computation.
    compute: RefCell<Box<dyn FnMut() -> T>>,
    /// Raised by the runtime when a source changes.
    stale: Rc<Cell<bool>>,
}

/// Derived signal recomputed lazily from its tracked dependencies.
pub struct Memo<T: 'static> {
    /// Shared storage and identity.
    inner: Rc<MemoInner<T>>,
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Memo<T> {
    /// Creates a memo from a tracked computation.
    ///
    /// The computation does not run here; the first read runs it.
    pub fn new(compute: impl FnMut() -> T + 'static) -> Self {
        let stale = Rc::new(Cell::new(true));
        let node = with_runtime(|rt| {
            rt.insert_node(NodeKind::Memo {
                stale: Rc::clone(&stale),
            })
        });
        Self {
            inner: Rc::new(MemoInner {
                node,
                value: RefCell::new(None),
                compute: RefCell::new(Box::new(compute)),
                stale,
            }),
        }
    }

    /// Reads the memo under tracking, recomputing first if stale.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        with_runtime(|rt| rt.track(self.inner.node));
        self.refresh();
        self.inner
            .value
            .borrow()
            .clone()
            .unwrap_or_else(|| unreachable!("memo read before refresh"))
    }

    /// Applies `f` to the memo value under tracking.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        with_runtime(|rt| rt.track(self.inner.node));
        self.refresh();
        match self.inner.value.borrow().as_ref() {
            Some(value) => f(value),
            None => unreachable!("memo read before refresh"),
        }
    }

    /// Reads the memo without registering a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.refresh();
        self.inner
            .value
            .borrow()
            .clone()
            .unwrap_or_else(|| unreachable!("memo read before refresh"))
    }

    /// Recomputes the cached value if the staleness flag is raised.
    fn refresh(&self) {
        if !self.inner.stale.get() && self.inner.value.borrow().is_some() {
            return;
        }
        self.inner.stale.set(false);
        let value = with_runtime(|rt| {
            rt.run_memo(self.inner.node, || {
                let mut compute = self.inner.compute.borrow_mut();
                (*compute)()
            })
        });
        *self.inner.value.borrow_mut() = Some(value);
    }
}
