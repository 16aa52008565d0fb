// crates/stackscope-reactive/src/effect.rs
// ============================================================================
// Module: Effect
// Description: Reactive closure with scoped cleanup.
// Purpose: Re-run a tracked closure when its dependencies change, invoking
//          the previous cleanup before each re-run and on disposal.
// Dependencies: crate::runtime
// ============================================================================

//! ## Overview
//! An [`Effect`] runs its closure once at construction, under dependency
//! tracking, and re-runs it whenever a tracked signal or memo changes.
//! Re-runs are queued and coalesced: any number of dependency changes within
//! one turn produce exactly one re-run.
//!
//! Invariants:
//! - The cleanup returned by the previous run executes before the next run
//!   and on disposal, exactly once.
//! - Dependency sets are rebuilt from scratch on every run; stale
//!   subscriptions from prior runs do not linger.

use std::rc::Rc;

use crate::runtime::NodeId;
use crate::runtime::NodeKind;
use crate::runtime::with_runtime;

/// Cleanup callback returned by an effect run.
pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// The closure and pending cleanup backing one effect.
pub(crate) struct EffectFn {
    /// User closure; returns an optional cleanup for the next run.
    func: Box<dyn FnMut() -> Option<Cleanup>>,
    /// Cleanup produced by the previous run, if any.
    cleanup: Option<Cleanup>,
}

impl EffectFn {
    /// Runs the pending cleanup, then the closure, storing its new cleanup.
    pub(crate) fn run(&mut self) {
        self.run_cleanup();
        self.cleanup = (self.func)();
    }

    /// Runs and clears the pending cleanup, if any.
    pub(crate) fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Reactive closure handle.
///
/// Dropping the handle does not stop the effect; it stops when its owning
/// [`Scope`](crate::Scope) is disposed or [`Effect::dispose`] is called.
pub struct Effect {
    /// Arena identity.
    node: NodeId,
}

impl Effect {
    /// Creates an effect with no cleanup and runs it once synchronously.
    pub fn new(mut f: impl FnMut() + 'static) -> Self {
        Self::create(Box::new(move || {
            f();
            None
        }))
    }

    /// Creates an effect whose runs return a cleanup callback.
    ///
    /// The cleanup runs before the next re-run and on disposal.
    pub fn with_cleanup(mut f: impl FnMut() -> Cleanup + 'static) -> Self {
        Self::create(Box::new(move || Some(f())))
    }

    /// Registers the node and performs the initial tracked run.
    fn create(func: Box<dyn FnMut() -> Option<Cleanup>>) -> Self {
        let node = with_runtime(|rt| {
            rt.insert_node(NodeKind::Effect {
                func: Rc::new(std::cell::RefCell::new(EffectFn {
                    func,
                    cleanup: None,
                })),
            })
        });
        with_runtime(|rt| rt.run_effect(node));
        Self { node }
    }

    /// Stops the effect, running its pending cleanup.
    pub fn dispose(&self) {
        let func = with_runtime(|rt| rt.effect_fn(self.node));
        if let Some(func) = func {
            func.borrow_mut().run_cleanup();
        }
        with_runtime(|rt| rt.remove_node(self.node));
    }
}
