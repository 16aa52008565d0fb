// crates/stackscope-graph/src/lib.rs
// ============================================================================
// Module: Stackscope Graph
// Description: Reactive entity graph with typed edges, indexes, and rollups.
// Purpose: Provide the store, collections, lifecycle propagation, and
//          derived-state rollups the debugger domain model is built on.
// Dependencies: stackscope-reactive, slotmap, indexmap, rustc-hash,
//               serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! The graph is an arena of typed entities. Every entity carries signal-backed
//! fields, declared edges to other entities, and a lifecycle pair
//! (`current`, `alive`). Collections are insertion-ordered sets with named
//! indexes; rollups are memos derived from collection membership and item
//! signals.
//!
//! Invariants:
//! - The graph is single-threaded; handles are not `Send`.
//! - A disposed entity is absent from every collection and every index
//!   bucket.
//! - Disposal walks `strong` edges only; staleness walks `strong` and
//!   `lifecycle` edges; `weak` edges propagate neither.
//! - Strong children observe `alive=false` no later than their parent.

mod collection;
mod edge;
mod entity;
mod error;
mod rollup;
mod store;
mod view;

pub use collection::Collection;
pub use collection::CollectionEvent;
pub use collection::IndexKey;
pub use edge::EdgeSlot;
pub use entity::EdgeHandle;
pub use entity::EdgeKind;
pub use entity::EntityId;
pub use entity::Lifecycle;
pub use entity::Node;
pub use error::GraphError;
pub use store::Store;
pub use view::FilteredView;

#[cfg(test)]
mod tests;
