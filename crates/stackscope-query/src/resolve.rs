// crates/stackscope-query/src/resolve.rs
// ============================================================================
// Module: Query Resolution
// Description: Evaluation of parsed queries against the entity graph.
// Purpose: Walk edges by name, apply filters (index-accelerated where
//          possible), select elements, and resolve focus anchors.
// Dependencies: stackscope-graph, serde_json, crate::ast, crate::error
// ============================================================================

//! ## Overview
//! Resolution starts from the root entity, or from the entity an anchor
//! denotes inside the focused URL, and walks one segment at a time. Each
//! segment maps the current entity set through the named edge, filters the
//! targets, and optionally selects one element.
//!
//! Invariants:
//! - Resolution never mutates the graph.
//! - An equality filter on an indexed field reads the index bucket instead
//!   of scanning; results are identical to the scan.
//! - A segment naming an edge an entity does not declare contributes no
//!   results for that entity; it is not an error.

use std::cmp::Ordering;
use std::rc::Rc;

use serde_json::Value;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EntityId;
use stackscope_graph::IndexKey;
use stackscope_graph::Node;
use stackscope_graph::Store;

use crate::ast::Filter;
use crate::ast::FilterOp;
use crate::ast::Query;
use crate::ast::Segment;
use crate::ast::Selector;
use crate::error::QueryError;
use crate::parser::parse_query;

/// Resolves `input` to the full result list.
///
/// `focused` is the debugger's focused URL, used to resolve anchors.
///
/// # Errors
///
/// Returns parse errors and [`QueryError::UnresolvedAnchor`]; an empty
/// result is not an error here.
pub fn resolve(
    store: &Store,
    root: EntityId,
    focused: Option<&str>,
    input: &str,
) -> Result<Vec<EntityId>, QueryError> {
    let query = parse_query(input)?;
    resolve_parsed(store, root, focused, &query)
}

/// Resolves `input`, requiring exactly one entity.
///
/// # Errors
///
/// Returns [`QueryError::NotFound`] for zero results and
/// [`QueryError::Ambiguous`] for more than one.
pub fn query_one(
    store: &Store,
    root: EntityId,
    focused: Option<&str>,
    input: &str,
) -> Result<EntityId, QueryError> {
    let results = resolve(store, root, focused, input)?;
    match results.as_slice() {
        [] => Err(QueryError::NotFound),
        [only] => Ok(*only),
        many => Err(QueryError::Ambiguous { count: many.len() }),
    }
}

/// Resolves `input`, returning zero or more entities.
///
/// # Errors
///
/// Returns parse and anchor errors only.
pub fn query_many(
    store: &Store,
    root: EntityId,
    focused: Option<&str>,
    input: &str,
) -> Result<Vec<EntityId>, QueryError> {
    resolve(store, root, focused, input)
}

/// Resolves a parsed query.
fn resolve_parsed(
    store: &Store,
    root: EntityId,
    focused: Option<&str>,
    query: &Query,
) -> Result<Vec<EntityId>, QueryError> {
    let start = match &query.anchor {
        Some(anchor) => vec![resolve_anchor(store, root, focused, anchor)?],
        None => vec![root],
    };
    let mut current = start;
    for segment in &query.segments {
        let mut next = Vec::new();
        for entity in &current {
            next.extend(resolve_segment(store, *entity, segment));
        }
        current = next;
    }
    Ok(current)
}

/// Resolves a focus anchor to its entity.
///
/// The focused URL is replayed from the root; the entity reached by the
/// last segment whose edge matches the anchor's plural edge name is the
/// anchor target.
///
/// # Errors
///
/// Returns [`QueryError::UnresolvedAnchor`] when no focus is set, the
/// focused URL does not parse, or it does not pass through the anchor's
/// edge.
pub fn resolve_anchor(
    store: &Store,
    root: EntityId,
    focused: Option<&str>,
    anchor: &str,
) -> Result<EntityId, QueryError> {
    let unresolved = || QueryError::UnresolvedAnchor {
        anchor: anchor.to_owned(),
    };
    let focused = focused.ok_or_else(unresolved)?;
    let query = parse_query(focused).map_err(|_| unresolved())?;
    if query.anchor.is_some() {
        // Focused URLs are canonical root-relative paths.
        return Err(unresolved());
    }
    let edge_name = plural_of(anchor);
    let mut cursor = root;
    let mut matched = None;
    for segment in &query.segments {
        let results = resolve_segment(store, cursor, segment);
        let Some(next) = results.first().copied() else {
            break;
        };
        cursor = next;
        if segment.edge == edge_name {
            matched = Some(cursor);
        }
    }
    matched.ok_or_else(unresolved)
}

/// Returns the plural edge name of an anchor kind.
fn plural_of(anchor: &str) -> String {
    format!("{anchor}s")
}

/// Resolves one segment from one entity.
fn resolve_segment(store: &Store, entity: EntityId, segment: &Segment) -> Vec<EntityId> {
    let Some(node) = store.get(entity) else {
        return Vec::new();
    };
    let Some(edge) = node.edge(&segment.edge) else {
        return Vec::new();
    };
    let candidates = edge_candidates(&edge, &segment.filters);
    let mut matched: Vec<EntityId> = candidates
        .into_iter()
        .filter(|candidate| {
            store
                .get(*candidate)
                .is_some_and(|target| matches_filters(&target, &segment.filters))
        })
        .collect();
    match segment.selector {
        None => matched,
        Some(Selector::First) => matched.first().copied().into_iter().collect(),
        Some(Selector::Last) => matched.last().copied().into_iter().collect(),
        Some(Selector::Index(index)) => {
            if index < matched.len() {
                vec![matched.swap_remove(index)]
            } else {
                Vec::new()
            }
        }
    }
}

/// Lists the edge targets, reading an index bucket when a filter allows it.
fn edge_candidates(edge: &EdgeHandle, filters: &[Filter]) -> Vec<EntityId> {
    if let EdgeHandle::Many(collection) = edge {
        for filter in filters {
            if filter.op != FilterOp::Eq || !collection.has_index(&filter.field) {
                continue;
            }
            let Some(key) = IndexKey::from_json(&filter.value) else {
                continue;
            };
            if let Ok(bucket) = collection.by(&filter.field, &key) {
                return bucket;
            }
        }
    }
    edge.target_ids()
}

/// Applies every filter term to one entity.
fn matches_filters(node: &Rc<dyn Node>, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        node.field(&filter.field)
            .is_some_and(|value| compare(&value, filter.op, &filter.value))
    })
}

/// Compares a field value against a filter literal.
///
/// Equality is JSON equality with numeric widening; ordering operators are
/// numeric only and evaluate to false for non-numeric operands.
fn compare(field: &Value, op: FilterOp, literal: &Value) -> bool {
    match op {
        FilterOp::Eq => loose_eq(field, literal),
        FilterOp::Ne => !loose_eq(field, literal),
        FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
            let Some(ordering) = numeric_ordering(field, literal) else {
                return false;
            };
            match op {
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Le => ordering != Ordering::Greater,
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Ge => ordering != Ordering::Less,
                FilterOp::Eq | FilterOp::Ne => false,
            }
        }
    }
}

/// JSON equality with numeric widening between integer representations.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_i64(), right.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

/// Total ordering over numeric operands, `None` otherwise.
fn numeric_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    let a = left.as_f64()?;
    let b = right.as_f64()?;
    a.partial_cmp(&b)
}
