// crates/stackscope-query/src/error.rs
// ============================================================================
// Module: Query Errors
// Description: Parse and resolution failures for graph queries.
// Purpose: Report structured errors with byte positions for parse failures
//          and cardinality failures for resolution.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Parse errors carry the byte offset of the offending input so callers can
//! point at the failure. Resolution errors distinguish "nothing matched"
//! from "more than one matched where one was required".

use thiserror::Error;

/// Errors returned by query parsing and resolution.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Input was empty or contained only whitespace.
    #[error("query is empty")]
    EmptyInput,
    /// Input exceeded the configured size limit.
    #[error("query exceeds {max_bytes} bytes (got {actual_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Unexpected token encountered during parsing.
    #[error("expected {expected} at byte {position}, found {found:?}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The text that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Numeric literal failed to parse or overflowed.
    #[error("invalid number {raw:?} at byte {position}")]
    InvalidNumber {
        /// The raw numeric text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// The query resolved to nothing where one entity was required.
    #[error("query resolved to no entity")]
    NotFound,
    /// The query resolved to several entities where one was required.
    #[error("query resolved to {count} entities where one was required")]
    Ambiguous {
        /// Number of entities the query resolved to.
        count: usize,
    },
    /// An anchor was used while no focus is set, or the focused URL does not
    /// pass through the anchor's type.
    #[error("anchor @{anchor} does not resolve from the current focus")]
    UnresolvedAnchor {
        /// The anchor name.
        anchor: String,
    },
}
