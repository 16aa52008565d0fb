// crates/stackscope-reactive/src/tests.rs
// ============================================================================
// Module: Reactive Unit Tests
// Description: Signal, memo, effect, and scope behavior.
// Purpose: Validate coalescing, atomic turns, equality gating, and disposal
//          ordering.
// Dependencies: stackscope-reactive
// ============================================================================

//! Unit tests for the reactive primitives.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::cell::RefCell;
use std::rc::Rc;

use crate::Effect;
use crate::Memo;
use crate::Scope;
use crate::Signal;
use crate::batch;

#[test]
fn signal_get_returns_initial_value() {
    let signal = Signal::new(7);
    assert_eq!(signal.get(), 7);
}

#[test]
fn effect_reruns_on_change() {
    let signal = Signal::new(1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let reader = signal.clone();
    let _effect = Effect::new(move || log.borrow_mut().push(reader.get()));
    signal.set(2);
    signal.set(3);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[test]
fn equal_write_does_not_notify() {
    let signal = Signal::new(5);
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let reader = signal.clone();
    let _effect = Effect::new(move || {
        let _ = reader.get();
        *counter.borrow_mut() += 1;
    });
    signal.set(5);
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn never_equal_signal_always_notifies() {
    let signal = Signal::never_equal(5);
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let reader = signal.clone();
    let _effect = Effect::new(move || {
        let _ = reader.get();
        *counter.borrow_mut() += 1;
    });
    signal.set(5);
    signal.set(5);
    assert_eq!(*runs.borrow(), 3);
}

#[test]
fn custom_comparator_gates_writes() {
    // Compare only the first tuple element.
    let signal = Signal::with_comparator((1, 1), |a: &(i32, i32), b| a.0 == b.0);
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let reader = signal.clone();
    let _effect = Effect::new(move || {
        let _ = reader.get();
        *counter.borrow_mut() += 1;
    });
    signal.set((1, 99));
    assert_eq!(*runs.borrow(), 1);
    signal.set((2, 99));
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn batch_coalesces_to_one_rerun() {
    let a = Signal::new(0);
    let b = Signal::new(0);
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let (ra, rb) = (a.clone(), b.clone());
    let _effect = Effect::new(move || {
        let _ = (ra.get(), rb.get());
        *counter.borrow_mut() += 1;
    });
    batch(|| {
        a.set(1);
        b.set(1);
        a.set(2);
    });
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn batched_writes_are_observed_atomically() {
    let a = Signal::new(0);
    let b = Signal::new(0);
    let observed = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&observed);
    let (ra, rb) = (a.clone(), b.clone());
    let _effect = Effect::new(move || log.borrow_mut().push((ra.get(), rb.get())));
    batch(|| {
        a.set(1);
        b.set(1);
    });
    // Never (1, 0): both writes land before the single re-run.
    assert_eq!(*observed.borrow(), vec![(0, 0), (1, 1)]);
}

#[test]
fn memo_is_lazy_and_caches() {
    let signal = Signal::new(2);
    let computations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&computations);
    let reader = signal.clone();
    let memo = Memo::new(move || {
        *counter.borrow_mut() += 1;
        reader.get() * 10
    });
    assert_eq!(*computations.borrow(), 0);
    assert_eq!(memo.get(), 20);
    assert_eq!(memo.get(), 20);
    assert_eq!(*computations.borrow(), 1);
    signal.set(3);
    assert_eq!(*computations.borrow(), 1);
    assert_eq!(memo.get(), 30);
    assert_eq!(*computations.borrow(), 2);
}

#[test]
fn effect_tracks_through_memo() {
    let signal = Signal::new(1);
    let reader = signal.clone();
    let memo = Memo::new(move || reader.get() + 1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let derived = memo.clone();
    let _effect = Effect::new(move || log.borrow_mut().push(derived.get()));
    signal.set(5);
    assert_eq!(*seen.borrow(), vec![2, 6]);
}

#[test]
fn effect_cleanup_runs_before_rerun_and_on_dispose() {
    let signal = Signal::new(0);
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&events);
    let reader = signal.clone();
    let effect = Effect::with_cleanup(move || {
        let value = reader.get();
        log.borrow_mut().push(format!("run {value}"));
        let log = Rc::clone(&log);
        Box::new(move || log.borrow_mut().push(format!("clean {value}")))
    });
    signal.set(1);
    effect.dispose();
    assert_eq!(
        *events.borrow(),
        vec!["run 0", "clean 0", "run 1", "clean 1"]
    );
}

#[test]
fn write_from_effect_is_deferred_to_same_turn() {
    let source = Signal::new(0);
    let echo = Signal::new(0);
    let reader = source.clone();
    let writer = echo.clone();
    let _forward = Effect::new(move || writer.set(reader.get()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let echoed = echo.clone();
    let _observe = Effect::new(move || log.borrow_mut().push(echoed.get()));
    source.set(4);
    assert_eq!(*seen.borrow(), vec![0, 4]);
}

#[test]
fn subscribe_is_eager_unless_lazy() {
    let signal = Signal::new(1);
    let eager = Rc::new(RefCell::new(Vec::new()));
    let lazy = Rc::new(RefCell::new(Vec::new()));
    let eager_log = Rc::clone(&eager);
    let lazy_log = Rc::clone(&lazy);
    let _eager = signal.subscribe(move |v| eager_log.borrow_mut().push(*v), false);
    let _lazy = signal.subscribe(move |v| lazy_log.borrow_mut().push(*v), true);
    signal.set(2);
    assert_eq!(*eager.borrow(), vec![1, 2]);
    assert_eq!(*lazy.borrow(), vec![2]);
}

#[test]
fn unsubscribe_stops_delivery() {
    let signal = Signal::new(1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let subscription = signal.subscribe(move |v| log.borrow_mut().push(*v), false);
    signal.set(2);
    subscription.unsubscribe();
    signal.set(3);
    assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[test]
fn scope_disposal_stops_owned_effects() {
    let signal = Signal::new(0);
    let runs = Rc::new(RefCell::new(0));
    let scope = Scope::new();
    scope.with(|| {
        let counter = Rc::clone(&runs);
        let reader = signal.clone();
        let _effect = Effect::new(move || {
            let _ = reader.get();
            *counter.borrow_mut() += 1;
        });
    });
    signal.set(1);
    scope.dispose();
    signal.set(2);
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn scope_cleanups_run_lifo_after_children() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let scope = Scope::new();
    scope.with(|| {
        let log = Rc::clone(&events);
        Scope::on_cleanup(move || log.borrow_mut().push("parent first"));
        let child = Scope::new();
        child.with(|| {
            let log = Rc::clone(&events);
            Scope::on_cleanup(move || log.borrow_mut().push("child"));
        });
        let log = Rc::clone(&events);
        Scope::on_cleanup(move || log.borrow_mut().push("parent second"));
    });
    scope.dispose();
    assert_eq!(
        *events.borrow(),
        vec!["child", "parent second", "parent first"]
    );
}

#[test]
fn scope_disposal_is_idempotent() {
    let runs = Rc::new(RefCell::new(0));
    let scope = Scope::new();
    scope.with(|| {
        let counter = Rc::clone(&runs);
        Scope::on_cleanup(move || *counter.borrow_mut() += 1);
    });
    scope.dispose();
    scope.dispose();
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn signal_readable_after_scope_disposal() {
    let scope = Scope::new();
    let signal = scope.with(|| Signal::new(41));
    signal.set(42);
    scope.dispose();
    assert_eq!(signal.get(), 42);
}
