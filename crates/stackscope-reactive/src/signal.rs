// crates/stackscope-reactive/src/signal.rs
// ============================================================================
// Module: Signal
// Description: Observable single-value container with configurable equality.
// Purpose: Provide tracked reads, change-gated writes, and subscriptions.
// Dependencies: crate::runtime
// ============================================================================

//! ## Overview
//! A [`Signal`] holds one value. Reads inside a tracked computation register
//! the computation as a subscriber; writes that change the value (under the
//! signal's equality policy) mark subscribers dirty and schedule a flush.
//!
//! Invariants:
//! - A write that compares equal under the equality policy is a no-op: the
//!   stored value is not replaced and no subscriber is notified.
//! - Values survive node disposal: a handle held past scope disposal still
//!   reads the last stored value, it just no longer tracks or notifies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::effect::Effect;
use crate::runtime::NodeId;
use crate::runtime::NodeKind;
use crate::runtime::with_runtime;

/// Equality policy deciding whether a write is a change.
enum Equality<T> {
    /// Structural comparison via `PartialEq`.
    Structural(fn(&T, &T) -> bool),
    /// Every write is a change.
    Never,
    /// Caller-provided comparator.
    Custom(Rc<dyn Fn(&T, &T) -> bool>),
}

impl<T> Equality<T> {
    /// Returns true when `old` and `new` are equal under the policy.
    fn eq(&self, old: &T, new: &T) -> bool {
        match self {
            Self::Structural(eq) => eq(old, new),
            Self::Never => false,
            Self::Custom(eq) => eq(old, new),
        }
    }
}

/// Shared state backing one signal.
struct SignalInner<T> {
    /// Tracking identity in the runtime arena.
    node: NodeId,
    /// Current value.
    value: RefCell<T>,
    /// Write-gating policy.
    equality: Equality<T>,
}

/// Observable container for a single value.
///
/// Handles are cheap clones sharing the same storage. See the module
/// overview for tracking and notification semantics.
pub struct Signal<T: 'static> {
    /// Shared storage and identity.
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&*self.inner.value.borrow()).finish()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Creates a signal with structural equality.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, Equality::Structural(T::eq))
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a signal that treats every write as a change.
    pub fn never_equal(value: T) -> Self {
        Self::with_equality(value, Equality::Never)
    }

    /// Creates a signal with a caller-provided comparator.
    pub fn with_comparator(value: T, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self::with_equality(value, Equality::Custom(Rc::new(eq)))
    }

    /// Creates the shared state and registers the node with the runtime.
    fn with_equality(value: T, equality: Equality<T>) -> Self {
        let node = with_runtime(|rt| rt.insert_node(NodeKind::Signal));
        Self {
            inner: Rc::new(SignalInner {
                node,
                value: RefCell::new(value),
                equality,
            }),
        }
    }

    /// Reads the value under tracking and clones it out.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        with_runtime(|rt| rt.track(self.inner.node));
        self.inner.value.borrow().clone()
    }

    /// Reads the value without registering a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Applies `f` to the value under tracking, without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        with_runtime(|rt| rt.track(self.inner.node));
        f(&self.inner.value.borrow())
    }

    /// Applies `f` to the value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Stores `value` if it differs under the equality policy.
    ///
    /// On change, subscribers are marked dirty and a flush is scheduled; the
    /// flush runs immediately unless a batch or another flush is active.
    pub fn set(&self, value: T) {
        {
            let current = self.inner.value.borrow();
            if self.inner.equality.eq(&current, &value) {
                return;
            }
        }
        *self.inner.value.borrow_mut() = value;
        with_runtime(|rt| {
            rt.mark_dirty(self.inner.node);
            rt.maybe_flush();
        });
    }

    /// Mutates the value in place and unconditionally notifies.
    ///
    /// Used when in-place mutation makes an equality comparison meaningless,
    /// such as bumping a revision counter.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        with_runtime(|rt| {
            rt.mark_dirty(self.inner.node);
            rt.maybe_flush();
        });
    }

    /// Subscribes `f` to value changes.
    ///
    /// `f` runs synchronously with the current value at subscription time
    /// unless `lazy` is true. The returned [`Subscription`] unsubscribes on
    /// [`Subscription::unsubscribe`] or when the owning scope is disposed.
    pub fn subscribe(&self, mut f: impl FnMut(&T) + 'static, lazy: bool) -> Subscription {
        let signal = self.clone();
        let mut first = true;
        let effect = Effect::new(move || {
            let skip = first && lazy;
            first = false;
            signal.with(|value| {
                if !skip {
                    f(value);
                }
            });
        });
        Subscription { effect }
    }
}

/// Handle for an active [`Signal::subscribe`] registration.
pub struct Subscription {
    /// Backing effect that forwards values to the callback.
    effect: Effect,
}

impl Subscription {
    /// Cancels the subscription.
    pub fn unsubscribe(self) {
        self.effect.dispose();
    }
}
