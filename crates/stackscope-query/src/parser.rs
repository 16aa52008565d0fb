// crates/stackscope-query/src/parser.rs
// ============================================================================
// Module: Query Parser
// Description: Recursive-descent parser for the query path grammar.
// Purpose: Turn query text into a validated AST with positioned errors.
// Dependencies: serde_json, crate::ast, crate::error
// ============================================================================

//! ## Overview
//! A small hand-rolled parser over the input bytes. Identifiers are ASCII
//! alphanumerics plus `_`; filter values are integers, booleans, or bare
//! strings terminated by `,` or `)`. The parser enforces an input size limit
//! and never panics.

use serde_json::Value;

use crate::ast::Filter;
use crate::ast::FilterOp;
use crate::ast::Query;
use crate::ast::Segment;
use crate::ast::Selector;
use crate::error::QueryError;

/// Maximum allowed query input size in bytes.
const MAX_QUERY_INPUT_BYTES: usize = 4096;

/// Parses query text into a [`Query`].
///
/// # Errors
///
/// Returns a positioned [`QueryError`] on malformed input.
pub fn parse_query(input: &str) -> Result<Query, QueryError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyInput);
    }
    if trimmed.len() > MAX_QUERY_INPUT_BYTES {
        return Err(QueryError::InputTooLarge {
            max_bytes: MAX_QUERY_INPUT_BYTES,
            actual_bytes: trimmed.len(),
        });
    }
    let mut parser = Parser {
        input: trimmed,
        bytes: trimmed.as_bytes(),
        position: 0,
    };
    let query = parser.parse()?;
    if parser.position < parser.bytes.len() {
        return Err(parser.unexpected("end of input"));
    }
    Ok(query)
}

/// Byte-cursor parser state.
struct Parser<'a> {
    /// Original input, for error excerpts.
    input: &'a str,
    /// Input bytes.
    bytes: &'a [u8],
    /// Cursor position.
    position: usize,
}

impl Parser<'_> {
    /// Parses the full grammar entry point.
    fn parse(&mut self) -> Result<Query, QueryError> {
        let anchor = self.parse_anchor()?;
        let mut segments = Vec::new();
        if anchor.is_some() {
            // Anchor-relative segments are optional: `@frame` alone is valid.
            while self.eat(b'/') {
                segments.push(self.parse_segment()?);
            }
        } else {
            // Root-relative queries start with `/`; a bare `/` addresses the
            // root itself.
            if !self.eat(b'/') {
                return Err(self.unexpected("`/` or `@`"));
            }
            if self.position < self.bytes.len() {
                segments.push(self.parse_segment()?);
                while self.eat(b'/') {
                    segments.push(self.parse_segment()?);
                }
            }
        }
        Ok(Query { anchor, segments })
    }

    /// Parses an optional leading `@name` anchor.
    fn parse_anchor(&mut self) -> Result<Option<String>, QueryError> {
        if !self.eat(b'@') {
            return Ok(None);
        }
        let name = self.parse_identifier("anchor name")?;
        Ok(Some(name))
    }

    /// Parses one `edge(filter,…)[selector]` segment.
    fn parse_segment(&mut self) -> Result<Segment, QueryError> {
        let edge = self.parse_identifier("edge name")?;
        let mut filters = Vec::new();
        if self.eat(b'(') {
            loop {
                filters.push(self.parse_filter()?);
                if self.eat(b',') {
                    continue;
                }
                if self.eat(b')') {
                    break;
                }
                return Err(self.unexpected("`,` or `)`"));
            }
        }
        let selector = self.parse_selector()?;
        Ok(Segment {
            edge,
            filters,
            selector,
        })
    }

    /// Parses one `field op value` filter term.
    fn parse_filter(&mut self) -> Result<Filter, QueryError> {
        let field = self.parse_identifier("filter field")?;
        let op = self.parse_operator()?;
        let value = self.parse_value()?;
        Ok(Filter { field, op, value })
    }

    /// Parses a comparison operator.
    fn parse_operator(&mut self) -> Result<FilterOp, QueryError> {
        if self.eat(b'=') {
            return Ok(FilterOp::Eq);
        }
        if self.eat(b'!') {
            if self.eat(b'=') {
                return Ok(FilterOp::Ne);
            }
            return Err(self.unexpected("`=` after `!`"));
        }
        if self.eat(b'<') {
            return Ok(if self.eat(b'=') {
                FilterOp::Le
            } else {
                FilterOp::Lt
            });
        }
        if self.eat(b'>') {
            return Ok(if self.eat(b'=') {
                FilterOp::Ge
            } else {
                FilterOp::Gt
            });
        }
        Err(self.unexpected("comparison operator"))
    }

    /// Parses a filter literal: integer, boolean, or bare string.
    fn parse_value(&mut self) -> Result<Value, QueryError> {
        let start = self.position;
        while self.position < self.bytes.len()
            && !matches!(self.bytes[self.position], b',' | b')')
        {
            self.position += 1;
        }
        let raw = &self.input[start..self.position];
        if raw.is_empty() {
            return Err(self.unexpected("filter value"));
        }
        if raw == "true" {
            return Ok(Value::Bool(true));
        }
        if raw == "false" {
            return Ok(Value::Bool(false));
        }
        let numeric = raw
            .strip_prefix('-')
            .unwrap_or(raw)
            .bytes()
            .all(|byte| byte.is_ascii_digit());
        if numeric {
            let parsed: i64 = raw.parse().map_err(|_| QueryError::InvalidNumber {
                raw: raw.to_owned(),
                position: start,
            })?;
            return Ok(Value::from(parsed));
        }
        Ok(Value::String(raw.to_owned()))
    }

    /// Parses an optional `[…]` selector.
    fn parse_selector(&mut self) -> Result<Option<Selector>, QueryError> {
        if !self.eat(b'[') {
            return Ok(None);
        }
        let start = self.position;
        while self.position < self.bytes.len() && self.bytes[self.position] != b']' {
            self.position += 1;
        }
        if !self.eat(b']') {
            return Err(self.unexpected("`]`"));
        }
        let raw = &self.input[start..self.position - 1];
        let selector = match raw {
            "first" => Selector::First,
            "last" => Selector::Last,
            _ => {
                let index: usize = raw.parse().map_err(|_| QueryError::InvalidNumber {
                    raw: raw.to_owned(),
                    position: start,
                })?;
                Selector::Index(index)
            }
        };
        Ok(Some(selector))
    }

    /// Parses an ASCII identifier.
    fn parse_identifier(&mut self, expected: &'static str) -> Result<String, QueryError> {
        let start = self.position;
        while self.position < self.bytes.len()
            && (self.bytes[self.position].is_ascii_alphanumeric()
                || self.bytes[self.position] == b'_')
        {
            self.position += 1;
        }
        if start == self.position {
            return Err(self.unexpected(expected));
        }
        Ok(self.input[start..self.position].to_owned())
    }

    /// Consumes one byte if it matches.
    fn eat(&mut self, byte: u8) -> bool {
        if self.position < self.bytes.len() && self.bytes[self.position] == byte {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Builds a positioned unexpected-token error.
    fn unexpected(&self, expected: &'static str) -> QueryError {
        let found = self
            .input
            .get(self.position..)
            .map(|rest| rest.chars().take(8).collect::<String>())
            .unwrap_or_default();
        QueryError::UnexpectedToken {
            expected,
            found,
            position: self.position,
        }
    }
}
