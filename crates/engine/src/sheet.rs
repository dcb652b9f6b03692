//! The sheet: cell store, dependency bookkeeping, bounding box, printing.
//!
//! The sheet exclusively owns every `Cell`; the dependency graph refers to
//! them by `Position` only. A cell, once created, is never destroyed —
//! clearing marks its position blocked (absent for lookups and printing)
//! while the slot persists so back-references from dependents stay valid.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellContent, FORMULA_MARKER};
use crate::dep_graph::DepGraph;
use crate::error::SheetError;
use crate::formula::Formula;
use crate::position::Position;
use crate::value::Value;

/// Bounding box of the visible (non-blocked, occupied) area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

/// Read-only view of one cell, the narrow public surface at the boundary.
#[derive(Debug)]
pub struct CellView<'a> {
    sheet: &'a Sheet,
    cell: &'a Cell,
}

impl CellView<'_> {
    /// The cell's computed value. May populate the lazy cache as a side
    /// effect; observable text and structure are unchanged.
    pub fn value(&self) -> Value {
        self.sheet.evaluate_cell(self.cell)
    }

    pub fn text(&self) -> String {
        self.cell.text()
    }

    /// Valid positions the cell's formula reads from (empty for
    /// non-formula content).
    pub fn referenced_cells(&self) -> Vec<Position> {
        self.cell.referenced_cells()
    }
}

/// An in-memory spreadsheet.
#[derive(Debug, Default)]
pub struct Sheet {
    /// Ordered by Position's column-major total order.
    cells: BTreeMap<Position, Cell>,
    deps: DepGraph,
    /// Soft-deleted positions: absent for lookups and printing, while the
    /// cell object persists for dependency bookkeeping.
    blocked: FxHashSet<Position>,
    size: Size,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign raw text to a position.
    ///
    /// The call is atomic: a parse failure or a would-be circular reference
    /// leaves the cell's previous content, the edge sets, the blocked set
    /// and the bounding box all untouched. On success the position is
    /// unblocked and the bounding box grows (growth-only; it never shrinks
    /// here).
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        self.check_position(pos)?;

        // Identical text is a no-op at the cell level: no reclassification,
        // no rewiring, no invalidation.
        let unchanged = self.cells.get(&pos).map_or(false, |c| c.text() == text);
        if !unchanged {
            let content = Self::classify(text)?;
            let refs = match &content {
                CellContent::Formula(formula) => formula.referenced_positions(),
                _ => Vec::new(),
            };
            if self.deps.would_create_cycle(pos, &refs) {
                return Err(SheetError::CircularDependency(pos));
            }
            self.commit(pos, content, refs);
        }

        self.blocked.remove(&pos);
        self.grow_to(pos);
        Ok(())
    }

    /// Read access to the cell at `pos`, or `None` if the position was never
    /// written or is currently blocked.
    pub fn get_cell(&self, pos: Position) -> Result<Option<CellView<'_>>, SheetError> {
        self.check_position(pos)?;

        if self.blocked.contains(&pos) {
            return Ok(None);
        }
        Ok(self
            .cells
            .get(&pos)
            .map(|cell| CellView { sheet: self, cell }))
    }

    /// Empty the cell's content (through the normal mutation path, so
    /// dependents are invalidated) and mark the position blocked. The
    /// bounding box is recomputed from scratch and may shrink.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        self.check_position(pos)?;

        let occupied = self.cells.get(&pos).map_or(false, |c| !c.is_empty());
        if occupied {
            self.commit(pos, CellContent::Empty, Vec::new());
        }
        self.blocked.insert(pos);
        self.recount_size();
        Ok(())
    }

    /// The smallest bounding box covering all non-blocked occupied
    /// positions; `(0, 0)` if there are none.
    pub fn printable_size(&self) -> Size {
        self.size
    }

    /// Render every cell's computed value as a tab-separated grid.
    pub fn print_values<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        self.print_with(out, |cell| self.evaluate_cell(cell).to_string())
    }

    /// Render every cell's raw text as a tab-separated grid.
    pub fn print_texts<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        self.print_with(out, |cell| cell.text())
    }

    // =========================================================================
    // Mutation internals
    // =========================================================================

    fn check_position(&self, pos: Position) -> Result<(), SheetError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(SheetError::InvalidPosition(pos))
        }
    }

    fn classify(text: &str) -> Result<CellContent, SheetError> {
        if text.len() > 1 && text.starts_with(FORMULA_MARKER) {
            let formula = Formula::parse(&text[FORMULA_MARKER.len_utf8()..])
                .map_err(|err| SheetError::FormulaSyntax(err.to_string()))?;
            Ok(CellContent::Formula(formula))
        } else if text.is_empty() {
            Ok(CellContent::Empty)
        } else {
            Ok(CellContent::Literal(text.to_string()))
        }
    }

    /// Commit new content after the cycle check has passed: auto-vivify
    /// referenced cells, atomically rewire this cell's upstream edges, store
    /// the content, then invalidate every downstream cache.
    fn commit(&mut self, pos: Position, content: CellContent, refs: Vec<Position>) {
        for &target in &refs {
            if !self.cells.contains_key(&target) {
                self.cells.insert(target, Cell::new());
                self.grow_to(target);
            }
        }

        self.deps.replace_edges(pos, refs.into_iter().collect());
        self.cells
            .entry(pos)
            .or_insert_with(Cell::new)
            .set_content(content);
        self.invalidate_downstream(pos);
    }

    /// Clear the cached value of every cell downstream of `start`.
    ///
    /// Plain depth-first traversal on an explicit stack; the upstream graph
    /// is acyclic by construction, so the downstream graph is too and the
    /// walk terminates. The visited set only avoids redundant revisits —
    /// re-clearing an empty cache would be harmless.
    fn invalidate_downstream(&self, start: Position) {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = self.deps.downstream(start).collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(cell) = self.cells.get(&current) {
                cell.invalidate_cache();
            }
            stack.extend(self.deps.downstream(current));
        }
    }

    fn grow_to(&mut self, pos: Position) {
        if self.size.rows <= pos.row {
            self.size.rows = pos.row + 1;
        }
        if self.size.cols <= pos.col {
            self.size.cols = pos.col + 1;
        }
    }

    /// Full rescan of non-blocked occupied positions (shrink-capable,
    /// unlike `grow_to`).
    fn recount_size(&mut self) {
        let mut size = Size::default();
        for pos in self.cells.keys() {
            if self.blocked.contains(pos) {
                continue;
            }
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        self.size = size;
    }

    // =========================================================================
    // Evaluation internals
    // =========================================================================

    /// Resolve a referenced position for formula evaluation. Blocked and
    /// never-written positions read as absent.
    fn lookup_value(&self, pos: Position) -> Option<Value> {
        if self.blocked.contains(&pos) {
            return None;
        }
        let cell = self.cells.get(&pos)?;
        Some(self.evaluate_cell(cell))
    }

    fn evaluate_cell(&self, cell: &Cell) -> Value {
        match cell.content() {
            CellContent::Formula(formula) => {
                if let Some(cached) = cell.cached_value() {
                    return cached;
                }
                let value = formula.evaluate(|p| self.lookup_value(p));
                cell.store_cached_value(value.clone());
                value
            }
            _ => match cell.literal_value() {
                Some(value) => value,
                None => Value::Text(String::new()),
            },
        }
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> fmt::Result
    where
        W: fmt::Write,
        F: Fn(&Cell) -> String,
    {
        for row in 0..self.size.rows {
            for col in 0..self.size.cols {
                if col > 0 {
                    out.write_char('\t')?;
                }
                let pos = Position::new(row, col);
                if self.blocked.contains(&pos) {
                    continue;
                }
                if let Some(cell) = self.cells.get(&pos) {
                    out.write_str(&render(cell))?;
                }
            }
            out.write_char('\n')?;
        }
        Ok(())
    }
}
