//! A single grid slot: classified content plus a lazy value cache.

use std::cell::RefCell;

use crate::formula::Formula;
use crate::position::Position;
use crate::value::Value;

/// Leading character that marks formula text (`=A1+1`).
pub const FORMULA_MARKER: char = '=';
/// Leading character that suppresses formula interpretation of a literal
/// (`'=not a formula`). Stripped from the displayed value, retained in text.
pub const ESCAPE_MARKER: char = '\'';

/// Classified cell content, derived from the raw text last assigned.
#[derive(Debug, Clone, Default)]
pub enum CellContent {
    #[default]
    Empty,
    Literal(String),
    Formula(Formula),
}

/// One grid slot.
///
/// The cell owns its content and cached value only; the dependency edges
/// live in the sheet's `DepGraph`, keyed by `Position`, so cells never hold
/// references to each other.
///
/// The cache is behind a `RefCell`: reading a value may populate it as a
/// side effect without changing observable text or structure.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
    cache: RefCell<Option<Value>>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// Replace the content. Resets this cell's own cache; propagating the
    /// invalidation downstream is the sheet's job.
    pub fn set_content(&mut self, content: CellContent) {
        self.content = content;
        self.cache.replace(None);
    }

    /// The raw text form of the content. Formula text is the canonical
    /// re-serialization, so `=A1 +  1` reads back as `=A1+1`.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Literal(text) => text.clone(),
            CellContent::Formula(formula) => {
                format!("{}{}", FORMULA_MARKER, formula.expression_text())
            }
        }
    }

    /// The valid positions this cell's formula reads from (empty for
    /// non-formula content).
    pub fn referenced_cells(&self) -> Vec<Position> {
        match &self.content {
            CellContent::Formula(formula) => formula.referenced_positions(),
            _ => Vec::new(),
        }
    }

    /// The displayed value of non-formula content. Literal cells never
    /// auto-convert to numbers; a leading escape marker is stripped.
    pub fn literal_value(&self) -> Option<Value> {
        match &self.content {
            CellContent::Empty => Some(Value::Text(String::new())),
            CellContent::Literal(text) => {
                let display = text.strip_prefix(ESCAPE_MARKER).unwrap_or(text);
                Some(Value::Text(display.to_string()))
            }
            CellContent::Formula(_) => None,
        }
    }

    pub fn cached_value(&self) -> Option<Value> {
        self.cache.borrow().clone()
    }

    pub fn store_cached_value(&self, value: Value) {
        self.cache.replace(Some(value));
    }

    /// Clear the cached value. Clearing an already-empty cache is a no-op,
    /// so invalidation may revisit a cell harmlessly.
    pub fn invalidate_cache(&self) {
        self.cache.replace(None);
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }
}
