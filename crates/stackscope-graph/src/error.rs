// crates/stackscope-graph/src/error.rs
// ============================================================================
// Module: Graph Errors
// Description: Typed failures for synchronous graph mutations.
// Purpose: Report schema violations and lookup failures at the call site.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Synchronous graph mutations never panic; they report typed failures at
//! the call site. Propagation walks are infallible by construction.

use thiserror::Error;

/// Errors returned by graph mutations and lookups.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A one-to-one edge was linked while already occupied.
    #[error("edge {edge} is already occupied")]
    EdgeOccupied {
        /// Name of the occupied edge.
        edge: &'static str,
    },
    /// A collection was queried through an index it does not declare.
    #[error("collection {collection} has no index named {index}")]
    UnknownIndex {
        /// Name of the collection.
        collection: &'static str,
        /// The unknown index name.
        index: String,
    },
    /// An entity id did not resolve to a live entity.
    #[error("entity is not present in the store")]
    UnknownEntity,
}
