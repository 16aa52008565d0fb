// crates/stackscope-reactive/src/lib.rs
// ============================================================================
// Module: Stackscope Reactive
// Description: Single-threaded reactive primitives for the entity graph.
// Purpose: Provide signals, memos, effects, and disposal scopes with
//          coalesced, glitch-free change propagation.
// Dependencies: slotmap, indexmap, rustc-hash, tracing
// ============================================================================

//! ## Overview
//! This crate implements the reactive substrate the entity graph is built on.
//! A thread-local [`runtime`] arena owns every reactive node; public handles
//! ([`Signal`], [`Memo`], [`Effect`], [`Scope`]) are cheap clones that address
//! nodes in the arena.
//!
//! Invariants:
//! - All reactive operations execute on one logical thread; handles are not
//!   `Send` and the runtime is never shared across threads.
//! - Writes performed in one [`batch`] are observed atomically: an effect
//!   depending on two signals updated in the same batch never runs with one
//!   new value and one old value.
//! - Effect re-runs are coalesced: any number of dependency updates within a
//!   turn produce exactly one re-run per effect.
//! - A subscriber panic is caught, logged, and the subscriber dropped; the
//!   propagation turn continues.

mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;

pub use effect::Effect;
pub use memo::Memo;
pub use runtime::batch;
pub use runtime::detached;
pub use runtime::untracked;
pub use scope::Scope;
pub use signal::Signal;
pub use signal::Subscription;

#[cfg(test)]
mod tests;
