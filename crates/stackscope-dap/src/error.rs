// crates/stackscope-dap/src/error.rs
// ============================================================================
// Module: DAP Errors
// Description: Failure taxonomy for the debugger domain layer.
// Purpose: Distinguish request, transport, and graph failures so callers
//          can react per category.
// Dependencies: thiserror, stackscope-graph, stackscope-query
// ============================================================================

//! ## Overview
//! Synchronous mutations report failures at the call site; asynchronous
//! request failures materialise in the returned future. Malformed adapter
//! messages are logged and dropped, never surfaced as errors to callers.

use thiserror::Error;

/// Errors surfaced by the debugger domain layer.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DapError {
    /// The request did not complete within its timeout. No state was
    /// mutated.
    #[error("request timed out")]
    Timeout,
    /// The request future was abandoned before completion.
    #[error("request cancelled")]
    Cancelled,
    /// The adapter answered with an error response.
    #[error("adapter error: {message}")]
    Adapter {
        /// Adapter-reported error code, when present.
        code: Option<i64>,
        /// Adapter-reported error summary.
        message: String,
    },
    /// The transport to the adapter is gone. Session-fatal.
    #[error("adapter transport is dead")]
    TransportDead,
    /// A response body did not match the expected shape.
    #[error("malformed adapter message: {0}")]
    Malformed(String),
    /// The adapter did not advertise the capability the request needs.
    #[error("adapter does not support {0}")]
    Unsupported(&'static str),
    /// A DAP source carried neither a path nor a positive source reference.
    #[error("source carries neither a path nor a source reference")]
    UnidentifiableSource,
    /// No adapter spawner is configured for starting sessions.
    #[error("no adapter spawner configured")]
    NoSpawner,
    /// A graph mutation failed.
    #[error(transparent)]
    Graph(#[from] stackscope_graph::GraphError),
    /// A query failed to parse or resolve.
    #[error(transparent)]
    Query(#[from] stackscope_query::QueryError),
}
