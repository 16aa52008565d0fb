// crates/stackscope-reactive/src/scope.rs
// ============================================================================
// Module: Scope
// Description: Hierarchical cancellation context for reactive registrations.
// Purpose: Collect effects, subscriptions, and cleanups so they can be torn
//          down together, children before parents.
// Dependencies: crate::runtime
// ============================================================================

//! ## Overview
//! A [`Scope`] owns the reactive nodes and cleanup callbacks registered while
//! it is current. Disposing a scope disposes nested scopes first, then runs
//! cleanups in LIFO order, then removes owned nodes from the runtime.
//!
//! Invariants:
//! - Disposal is idempotent.
//! - A child scope created inside [`Scope::with`] is disposed with its
//!   parent.
//! - Registrations made while no scope is current are never cleaned up; the
//!   caller owns their lifetime.

use crate::runtime::ScopeId;
use crate::runtime::with_runtime;

/// Hierarchical disposal context.
///
/// The handle is cheap to copy; all state lives in the runtime arena.
#[derive(Clone, Copy)]
pub struct Scope {
    /// Arena identity.
    id: ScopeId,
}

impl Scope {
    /// Creates a scope.
    ///
    /// If another scope is current, the new scope is registered as its child
    /// and will be disposed with it.
    pub fn new() -> Self {
        Self {
            id: with_runtime(|rt| rt.insert_scope()),
        }
    }

    /// Runs `f` with this scope as the registration target.
    ///
    /// Signals, memos, effects, subscriptions, nested scopes, and cleanups
    /// created inside `f` are owned by this scope.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        with_runtime(|rt| rt.with_scope(self.id, f))
    }

    /// Registers a cleanup callback with the current scope.
    ///
    /// Cleanups run in LIFO order during disposal, after child scopes have
    /// been disposed. Without a current scope the callback is dropped.
    pub fn on_cleanup(f: impl FnOnce() + 'static) {
        with_runtime(|rt| rt.push_cleanup(Box::new(f)));
    }

    /// Disposes the scope: children first, then cleanups LIFO, then nodes.
    pub fn dispose(&self) {
        with_runtime(|rt| rt.dispose_scope(self.id));
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
