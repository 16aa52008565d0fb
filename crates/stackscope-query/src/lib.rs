// crates/stackscope-query/src/lib.rs
// ============================================================================
// Module: Stackscope Query
// Description: URL-addressable queries over the entity graph.
// Purpose: Parse `/type(filter)[index]/edge…` paths and resolve them against
//          the store, with focus-anchored relative paths.
// Dependencies: stackscope-graph, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Queries address the graph with a compact path grammar:
//!
//! ```text
//! url      := anchor? segment ('/' segment)*
//! anchor   := '@' name
//! segment  := edge (filter)? selector?
//! filter   := '(' field op value (',' field op value)* ')'
//! op       := '=' | '!=' | '<' | '<=' | '>' | '>='
//! selector := '[' integer | 'first' | 'last' ']'
//! ```
//!
//! Resolution starts at the root entity, or at the entity an anchor denotes
//! within the focused URL, and walks edges by their plural names. Filters
//! prefer a declared collection index when the operator is equality; a
//! selector picks one element; without a selector the whole result list is
//! returned.
//!
//! Invariants:
//! - Parsing never panics, for any input.
//! - Resolution performs no mutation.

mod ast;
mod error;
mod parser;
mod resolve;

pub use ast::Filter;
pub use ast::FilterOp;
pub use ast::Query;
pub use ast::Segment;
pub use ast::Selector;
pub use error::QueryError;
pub use parser::parse_query;
pub use resolve::query_many;
pub use resolve::query_one;
pub use resolve::resolve;
pub use resolve::resolve_anchor;

#[cfg(test)]
mod tests;
