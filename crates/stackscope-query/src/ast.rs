// crates/stackscope-query/src/ast.rs
// ============================================================================
// Module: Query AST
// Description: Parsed representation of a graph query path.
// Purpose: Carry anchors, segments, filters, and selectors between the
//          parser and the resolver, with canonical printing.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The AST mirrors the query grammar one-to-one. [`Query::to_string`]
//! prints the canonical form, so `parse(print(q)) == q` for every valid
//! query.

use std::fmt;

use serde_json::Value;

/// Comparison operator of a filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Numeric less-than.
    Lt,
    /// Numeric less-than-or-equal.
    Le,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-than-or-equal.
    Ge,
}

impl FilterOp {
    /// Returns the surface syntax of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// One `field op value` filter term.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name the term reads.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Literal to compare against: integer, boolean, or string.
    pub value: Value,
}

/// Element selection applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Zero-based position in the result list.
    Index(usize),
    /// The first element.
    First,
    /// The last element.
    Last,
}

/// One path segment: an edge name, optional filters, optional selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Edge name, lowercase plural.
    pub edge: String,
    /// Filter terms, all of which must hold.
    pub filters: Vec<Filter>,
    /// Optional element selection.
    pub selector: Option<Selector>,
}

/// A parsed query path.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Focus anchor name, without the `@`.
    pub anchor: Option<String>,
    /// Path segments in traversal order.
    pub segments: Vec<Segment>,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(anchor) = &self.anchor {
            write!(f, "@{anchor}")?;
            for segment in &self.segments {
                write!(f, "/{segment}")?;
            }
        } else {
            for segment in &self.segments {
                write!(f, "/{segment}")?;
            }
            if self.segments.is_empty() {
                f.write_str("/")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.edge)?;
        if !self.filters.is_empty() {
            f.write_str("(")?;
            for (position, filter) in self.filters.iter().enumerate() {
                if position > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{filter}")?;
            }
            f.write_str(")")?;
        }
        match self.selector {
            Some(Selector::Index(index)) => write!(f, "[{index}]")?,
            Some(Selector::First) => f.write_str("[first]")?,
            Some(Selector::Last) => f.write_str("[last]")?,
            None => {}
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.field, self.op.symbol())?;
        match &self.value {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}
