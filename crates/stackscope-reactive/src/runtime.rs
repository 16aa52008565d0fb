// crates/stackscope-reactive/src/runtime.rs
// ============================================================================
// Module: Reactive Runtime
// Description: Thread-local arena for reactive nodes and propagation state.
// Purpose: Own dependency edges, schedule effects, and flush turns.
// Dependencies: slotmap, indexmap, rustc-hash, tracing
// ============================================================================

//! ## Overview
//! The runtime owns every reactive node in a slotmap arena and maintains the
//! dependency graph as two secondary maps (`sources` and `subscribers`).
//! Signals mark their dependents dirty on write; dirty effects are queued and
//! drained in a single flush loop per turn.
//!
//! Invariants:
//! - `sources` and `subscribers` are symmetric: `a` lists `b` as a source iff
//!   `b` lists `a` as a subscriber.
//! - The flush loop never re-enters itself. Writes issued while flushing are
//!   appended to the live queue and drained by the same loop, after the
//!   current fan-out completes.
//! - Disposed nodes are removed from both dependency maps before the arena
//!   entry is dropped.

use std::cell::Cell;
use std::cell::RefCell;
use std::hash::BuildHasherDefault;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::FxHasher;
use slotmap::SecondaryMap;
use slotmap::SlotMap;
use slotmap::new_key_type;

use crate::effect::EffectFn;

/// Insertion-ordered set keyed with the fast non-cryptographic hasher.
pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

new_key_type! {
    /// Arena key addressing one reactive node.
    pub(crate) struct NodeId;
}

new_key_type! {
    /// Arena key addressing one disposal scope.
    pub(crate) struct ScopeId;
}

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::default();
}

/// What a node does when one of its sources changes.
pub(crate) enum NodeKind {
    /// Plain value container. Signals have no sources.
    Signal,
    /// Derived value. The flag is raised when a source changes and lowered on
    /// recomputation.
    Memo {
        /// Shared staleness flag, also held by the memo handle.
        stale: Rc<Cell<bool>>,
    },
    /// Reactive closure. Queued for re-run when a source changes.
    Effect {
        /// The tracked closure plus its pending cleanup.
        func: Rc<RefCell<EffectFn>>,
    },
}

/// One entry in a scope's disposal list.
pub(crate) enum ScopeItem {
    /// A reactive node owned by the scope.
    Node(NodeId),
    /// A user cleanup callback.
    Cleanup(Box<dyn FnOnce()>),
    /// A nested scope.
    Child(ScopeId),
}

/// Per-scope bookkeeping.
pub(crate) struct ScopeEntry {
    /// Disposal list in registration order.
    pub items: Vec<ScopeItem>,
    /// Set once the scope has been disposed. Disposal is idempotent.
    pub disposed: bool,
}

/// The thread-local reactive system.
#[derive(Default)]
pub(crate) struct Runtime {
    /// Node arena.
    nodes: RefCell<SlotMap<NodeId, NodeKind>>,
    /// Dependencies of each node (what it reads).
    sources: RefCell<SecondaryMap<NodeId, FxIndexSet<NodeId>>>,
    /// Dependents of each node (who reads it).
    subscribers: RefCell<SecondaryMap<NodeId, FxIndexSet<NodeId>>>,
    /// The node currently being tracked, if any.
    observer: Cell<Option<NodeId>>,
    /// Effects awaiting re-run this turn, in queue order.
    pending: RefCell<FxIndexSet<NodeId>>,
    /// True while the flush loop is draining the queue.
    flushing: Cell<bool>,
    /// Depth of nested `batch` calls.
    batch_depth: Cell<usize>,
    /// Scope arena.
    scopes: RefCell<SlotMap<ScopeId, ScopeEntry>>,
    /// The scope new nodes and cleanups register into.
    current_scope: Cell<Option<ScopeId>>,
}

/// Runs `f` with access to the thread-local runtime.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

impl Runtime {
    /// Inserts a node and registers it with the current scope.
    pub(crate) fn insert_node(&self, kind: NodeKind) -> NodeId {
        let id = self.nodes.borrow_mut().insert(kind);
        if let Some(scope) = self.current_scope.get() {
            if let Some(entry) = self.scopes.borrow_mut().get_mut(scope) {
                entry.items.push(ScopeItem::Node(id));
            }
        }
        id
    }

    /// Returns true if the node is still live in the arena.
    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.nodes.borrow().contains_key(id)
    }

    /// Records a read of `source` by the current observer, if any.
    pub(crate) fn track(&self, source: NodeId) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        if observer == source || !self.is_live(source) {
            return;
        }
        if let Some(entry) = self.sources.borrow_mut().entry(observer) {
            entry.or_default().insert(source);
        }
        if let Some(entry) = self.subscribers.borrow_mut().entry(source) {
            entry.or_default().insert(observer);
        }
    }

    /// Marks every dependent of `id` stale and queues reachable effects.
    ///
    /// Memos are flagged transitively so later reads recompute; effects are
    /// appended to the pending queue exactly once per turn.
    pub(crate) fn mark_dirty(&self, id: NodeId) {
        let dependents: Vec<NodeId> = self
            .subscribers
            .borrow()
            .get(id)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default();
        for dependent in dependents {
            let recurse = {
                let nodes = self.nodes.borrow();
                match nodes.get(dependent) {
                    Some(NodeKind::Memo { stale }) => {
                        stale.set(true);
                        true
                    }
                    Some(NodeKind::Effect { .. }) => {
                        self.pending.borrow_mut().insert(dependent);
                        false
                    }
                    Some(NodeKind::Signal) | None => false,
                }
            };
            if recurse {
                self.mark_dirty(dependent);
            }
        }
    }

    /// Drains the pending queue unless a batch or flush is already active.
    pub(crate) fn maybe_flush(&self) {
        if self.batch_depth.get() > 0 || self.flushing.get() {
            return;
        }
        self.flush();
    }

    /// Runs queued effects until the queue is empty.
    ///
    /// Effects queued by a running effect land at the tail of the live queue,
    /// so follow-up mutations are handled in the same turn but only after the
    /// current fan-out completes.
    fn flush(&self) {
        self.flushing.set(true);
        loop {
            let next = self.pending.borrow_mut().shift_remove_index(0);
            let Some(id) = next else {
                break;
            };
            self.run_effect(id);
        }
        self.flushing.set(false);
    }

    /// Re-runs one effect under dependency tracking.
    pub(crate) fn run_effect(&self, id: NodeId) {
        let func = {
            let nodes = self.nodes.borrow();
            match nodes.get(id) {
                Some(NodeKind::Effect { func }) => Rc::clone(func),
                _ => return,
            }
        };
        self.clear_sources(id);
        let prev = self.observer.replace(Some(id));
        let outcome = catch_unwind(AssertUnwindSafe(|| func.borrow_mut().run()));
        self.observer.set(prev);
        if outcome.is_err() {
            tracing::error!(target: "stackscope::reactive", "effect panicked; dropping subscriber");
            self.remove_node(id);
        }
    }

    /// Recomputes a memo value under tracking with the memo as observer.
    pub(crate) fn run_memo<R>(&self, id: NodeId, compute: impl FnOnce() -> R) -> R {
        self.clear_sources(id);
        let prev = self.observer.replace(Some(id));
        let value = compute();
        self.observer.set(prev);
        value
    }

    /// Runs `f` without dependency tracking.
    pub(crate) fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = self.observer.replace(None);
        let value = f();
        self.observer.set(prev);
        value
    }

    /// Returns the closure state of an effect node, if `id` is a live effect.
    pub(crate) fn effect_fn(&self, id: NodeId) -> Option<Rc<RefCell<EffectFn>>> {
        match self.nodes.borrow().get(id) {
            Some(NodeKind::Effect { func }) => Some(Rc::clone(func)),
            _ => None,
        }
    }

    /// Removes `id` from the subscriber sets of everything it reads.
    fn clear_sources(&self, id: NodeId) {
        let old_sources: Vec<NodeId> = self
            .sources
            .borrow_mut()
            .get_mut(id)
            .map(std::mem::take)
            .unwrap_or_default()
            .into_iter()
            .collect();
        let mut subscribers = self.subscribers.borrow_mut();
        for source in old_sources {
            if let Some(subs) = subscribers.get_mut(source) {
                subs.shift_remove(&id);
            }
        }
    }

    /// Removes a node from the arena and both dependency maps.
    pub(crate) fn remove_node(&self, id: NodeId) {
        self.clear_sources(id);
        let dependents: Vec<NodeId> = self
            .subscribers
            .borrow_mut()
            .remove(id)
            .map(|subs| subs.into_iter().collect())
            .unwrap_or_default();
        {
            let mut sources = self.sources.borrow_mut();
            for dependent in dependents {
                if let Some(deps) = sources.get_mut(dependent) {
                    deps.shift_remove(&id);
                }
            }
            sources.remove(id);
        }
        self.pending.borrow_mut().shift_remove(&id);
        self.nodes.borrow_mut().remove(id);
    }

    /// Creates a scope, optionally parented to the current scope.
    pub(crate) fn insert_scope(&self) -> ScopeId {
        let id = self.scopes.borrow_mut().insert(ScopeEntry {
            items: Vec::new(),
            disposed: false,
        });
        if let Some(parent) = self.current_scope.get() {
            if let Some(entry) = self.scopes.borrow_mut().get_mut(parent) {
                entry.items.push(ScopeItem::Child(id));
            }
        }
        id
    }

    /// Registers a cleanup callback with the current scope.
    ///
    /// Without an active scope the callback is dropped immediately and will
    /// never run; callers that need guaranteed cleanup must hold a scope.
    pub(crate) fn push_cleanup(&self, cleanup: Box<dyn FnOnce()>) {
        let Some(scope) = self.current_scope.get() else {
            return;
        };
        if let Some(entry) = self.scopes.borrow_mut().get_mut(scope) {
            entry.items.push(ScopeItem::Cleanup(cleanup));
        }
    }

    /// Clears and returns the current scope.
    pub(crate) fn take_current_scope(&self) -> Option<ScopeId> {
        self.current_scope.replace(None)
    }

    /// Restores a previously taken current scope.
    pub(crate) fn restore_current_scope(&self, scope: Option<ScopeId>) {
        self.current_scope.set(scope);
    }

    /// Runs `f` with `scope` as the registration target.
    pub(crate) fn with_scope<R>(&self, scope: ScopeId, f: impl FnOnce() -> R) -> R {
        let prev = self.current_scope.replace(Some(scope));
        let value = f();
        self.current_scope.set(prev);
        value
    }

    /// Disposes a scope: children first, then cleanups LIFO, then nodes.
    ///
    /// Double disposal is a no-op.
    pub(crate) fn dispose_scope(&self, id: ScopeId) {
        let items = {
            let mut scopes = self.scopes.borrow_mut();
            let Some(entry) = scopes.get_mut(id) else {
                return;
            };
            if entry.disposed {
                return;
            }
            entry.disposed = true;
            std::mem::take(&mut entry.items)
        };
        for item in items.iter().rev() {
            if let ScopeItem::Child(child) = item {
                self.dispose_scope(*child);
            }
        }
        let mut nodes = Vec::new();
        for item in items.into_iter().rev() {
            match item {
                ScopeItem::Cleanup(cleanup) => {
                    if catch_unwind(AssertUnwindSafe(cleanup)).is_err() {
                        tracing::error!(
                            target: "stackscope::reactive",
                            "scope cleanup panicked; continuing disposal"
                        );
                    }
                }
                ScopeItem::Node(node) => nodes.push(node),
                ScopeItem::Child(_) => {}
            }
        }
        for node in nodes {
            if let Some(func) = self.effect_fn(node) {
                func.borrow_mut().run_cleanup();
            }
            self.remove_node(node);
        }
        self.scopes.borrow_mut().remove(id);
    }

    /// Enters a batch turn.
    pub(crate) fn begin_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// Leaves a batch turn, flushing when the outermost batch ends.
    pub(crate) fn end_batch(&self) {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        if depth == 0 {
            self.maybe_flush();
        }
    }
}

/// Groups signal writes into one propagation turn.
///
/// Every effect depending on signals written inside `f` re-runs at most once,
/// after all writes have been applied. Batches nest; only the outermost batch
/// flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        rt.begin_batch();
        let value = f();
        rt.end_batch();
        value
    })
}

/// Runs `f` with dependency tracking suspended.
///
/// Signal reads inside `f` do not register the surrounding effect or memo as
/// a subscriber.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.untracked(f))
}

/// Runs `f` with no current scope.
///
/// Nodes created inside `f` are not registered with any scope; the caller
/// owns their disposal. Used by containers that manage per-item effects with
/// explicit lifetimes.
pub fn detached<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        let prev = rt.take_current_scope();
        let value = f();
        rt.restore_current_scope(prev);
        value
    })
}
