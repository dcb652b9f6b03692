//! Formula engine boundary.
//!
//! `Formula` is the only surface the cell/sheet core depends on: parse,
//! evaluate against a cell lookup, re-serialize canonically, and enumerate
//! referenced positions.

pub mod eval;
pub mod parser;

use crate::position::Position;
use crate::value::Value;

pub use parser::ParseError;

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: parser::Expr,
}

impl Formula {
    /// Parse formula source text (without its leading `=` marker).
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            expr: parser::parse(text)?,
        })
    }

    /// Evaluate against a cell lookup. Always produces a `Value`; evaluation
    /// errors surface as `Value::Error`, never as a failure.
    pub fn evaluate<F>(&self, lookup: F) -> Value
    where
        F: Fn(Position) -> Option<Value>,
    {
        eval::evaluate(&self.expr, &lookup)
    }

    /// Canonical re-serialization of the expression (no leading `=`).
    pub fn expression_text(&self) -> String {
        let mut out = String::new();
        self.expr.write_canonical(&mut out);
        out
    }

    /// The valid positions this formula reads from, sorted and deduplicated.
    /// References outside sheet bounds are excluded (they can never resolve).
    pub fn referenced_positions(&self) -> Vec<Position> {
        let mut refs = Vec::new();
        self.expr.collect_refs(&mut refs);
        refs.retain(|p| p.is_valid());
        refs.sort();
        refs.dedup();
        refs
    }
}
