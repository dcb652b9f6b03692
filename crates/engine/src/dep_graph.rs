//! Dependency graph for formula cells.
//!
//! One relation stored with two indices, named by role:
//!
//! ```text
//! upstream[B]   = cells B's formula reads from (its dependencies)
//! downstream[A] = cells whose formulas read from A (used for invalidation)
//! ```
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** B ∈ downstream[A] ⇔ A ∈ upstream[B].
//! 2. **No dangling entries:** empty sets are removed, not stored.
//! 3. **Acyclicity:** the upstream relation is acyclic whenever a mutation
//!    has completed; `would_create_cycle` guards every edge replacement.
//! 4. **Atomic updates:** `replace_edges` is the only mutator that touches
//!    both maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

/// Persistent dependency graph over cell positions.
///
/// Edges are lightweight identity keys into the sheet's cell store, never
/// owning references, so the reference graph being graph-shaped creates no
/// ownership cycle.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// For each formula cell B, the cells it reads from.
    upstream: FxHashMap<Position, FxHashSet<Position>>,

    /// For each referenced cell A, the formula cells reading from it.
    downstream: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells this cell's formula reads from.
    pub fn upstream(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.upstream
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Cells whose formulas read from this cell.
    pub fn downstream(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.downstream
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Number of cells with upstream dependencies tracked in the graph.
    pub fn formula_cell_count(&self) -> usize {
        self.upstream.len()
    }

    /// Number of cells referenced by at least one formula.
    pub fn referenced_cell_count(&self) -> usize {
        self.downstream.len()
    }

    /// Replace all upstream edges for a cell atomically.
    ///
    /// Removes the cell from every old upstream target's downstream set,
    /// then wires the new set in both directions. Pass an empty set when the
    /// cell's new content has no references.
    pub fn replace_edges(&mut self, cell: Position, new_upstream: FxHashSet<Position>) {
        if let Some(old_upstream) = self.upstream.remove(&cell) {
            for target in old_upstream {
                if let Some(deps) = self.downstream.get_mut(&target) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.downstream.remove(&target);
                    }
                }
            }
        }

        if new_upstream.is_empty() {
            return;
        }

        for target in &new_upstream {
            self.downstream.entry(*target).or_default().insert(cell);
        }
        self.upstream.insert(cell, new_upstream);
    }

    /// Check whether wiring `cell` to `new_upstream` would close a cycle.
    ///
    /// Does not modify the graph. Walks the committed upstream relation
    /// depth-first starting from the would-be references; reaching `cell`
    /// itself means the new formula (transitively) reads its own value.
    /// Positions with no committed edges terminate their branch — a cell
    /// that does not yet exist cannot contribute to a cycle.
    ///
    /// Iterative on an explicit stack; depth is bounded only by the graph's
    /// actual diameter.
    pub fn would_create_cycle(&self, cell: Position, new_upstream: &[Position]) -> bool {
        if new_upstream.contains(&cell) {
            return true;
        }

        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = new_upstream.to_vec();

        while let Some(current) = stack.pop() {
            if current == cell {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(targets) = self.upstream.get(&current) {
                stack.extend(targets.iter().copied());
            }
        }

        false
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (cell, upstream) in &self.upstream {
            for target in upstream {
                assert!(
                    self.downstream
                        .get(target)
                        .map_or(false, |s| s.contains(cell)),
                    "Missing downstream edge: {:?} should have {:?} in downstream",
                    target,
                    cell
                );
            }
        }

        for (cell, downstream) in &self.downstream {
            for dep in downstream {
                assert!(
                    self.upstream.get(dep).map_or(false, |s| s.contains(cell)),
                    "Missing upstream edge: {:?} should have {:?} in upstream",
                    dep,
                    cell
                );
            }
        }

        for (cell, upstream) in &self.upstream {
            assert!(!upstream.is_empty(), "Empty upstream set stored for {:?}", cell);
        }
        for (cell, downstream) in &self.downstream {
            assert!(
                !downstream.is_empty(),
                "Empty downstream set stored for {:?}",
                cell
            );
        }
    }
}
