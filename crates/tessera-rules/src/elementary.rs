//! Elementary (Wolfram) 1D automata displayed as a scrolling history.
//!
//! The bottom row of the grid holds the current generation. Each step,
//! every other row takes the value of the row below it, and the bottom row
//! is computed from each cell's `(left, self, right)` pattern, wrapping
//! horizontally. Earlier generations therefore scroll upward.

use tessera_grid::{Boundary, Neighborhood, Offset};

use crate::local::{CellContext, LocalRule, RuleShape};

/// Neighbor slots: below, left, right.
const BELOW: usize = 0;
const LEFT: usize = 1;
const RIGHT: usize = 2;

/// An elementary rule number `0..=255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryRule {
    number: u8,
    neighborhood: Neighborhood,
}

impl ElementaryRule {
    /// Create the rule for a Wolfram rule number.
    pub fn new(number: u8) -> Self {
        Self {
            number,
            neighborhood: Neighborhood::Custom(vec![
                Offset::new(0, 1),
                Offset::new(-1, 0),
                Offset::new(1, 0),
            ]),
        }
    }

    /// The Wolfram rule number.
    pub const fn number(&self) -> u8 {
        self.number
    }

    /// Next state for a `(left, center, right)` pattern.
    pub fn lookup(&self, left: bool, center: bool, right: bool) -> u8 {
        let mut pattern = 0_u32;
        if left {
            pattern |= 0b100;
        }
        if center {
            pattern |= 0b010;
        }
        if right {
            pattern |= 0b001;
        }
        self.number.checked_shr(pattern).unwrap_or(0) & 1
    }
}

impl LocalRule for ElementaryRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Deterministic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    /// Rows always wrap, whatever the grid's policy.
    fn boundary(&self) -> Option<Boundary> {
        Some(Boundary::Toroidal)
    }

    fn apply(&self, cell: u8, neighbors: &[u8], ctx: &CellContext) -> u8 {
        if !ctx.is_last_row() {
            return neighbors.get(BELOW).copied().unwrap_or(0);
        }
        let left = neighbors.get(LEFT).is_some_and(|&v| v != 0);
        let right = neighbors.get(RIGHT).is_some_and(|&v| v != 0);
        self.lookup(left, cell != 0, right)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::local::{Traversal, next_generation};
    use crate::random::CellRandom;
    use tessera_grid::{Boundary, Grid};

    #[test]
    fn rule_30_lookup_table() {
        let rule = ElementaryRule::new(30);
        // 30 = 0b0001_1110: patterns 1..=4 are live.
        let expected = [0, 1, 1, 1, 1, 0, 0, 0];
        for (pattern, want) in expected.iter().enumerate() {
            let left = pattern & 4 != 0;
            let center = pattern & 2 != 0;
            let right = pattern & 1 != 0;
            assert_eq!(rule.lookup(left, center, right), *want, "pattern {pattern}");
        }
    }

    #[test]
    fn history_scrolls_up_and_bottom_row_evolves() {
        let mut grid = Grid::new(7, 3, Boundary::Toroidal, 0_u8).unwrap();
        grid.set(3, 2, 1).unwrap();
        let rule = ElementaryRule::new(30);
        let next = next_generation(&grid, &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();

        // Previous bottom row moved up one.
        assert_eq!(next.get(3, 1), Some(1));
        assert_eq!(next.get(2, 1), Some(0));
        // Rule 30 from a single cell: 0111000 around the seed.
        let bottom: Vec<u8> = (0..7).map(|x| next.get(x, 2).unwrap()).collect();
        assert_eq!(bottom, vec![0, 0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn bottom_row_wraps_horizontally() {
        let mut grid = Grid::new(5, 2, Boundary::Toroidal, 0_u8).unwrap();
        grid.set(0, 1, 1).unwrap();
        // Rule 2: only pattern 001 is live, so the cell left of a live cell lights.
        let rule = ElementaryRule::new(2);
        let next = next_generation(&grid, &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
        assert_eq!(next.get(4, 1), Some(1));
    }

    #[test]
    fn wrap_ignores_the_grid_boundary() {
        let mut expected = None;
        for boundary in [Boundary::Toroidal, Boundary::Clamped, Boundary::ZeroFlux] {
            let mut grid = Grid::new(5, 1, boundary, 0_u8).unwrap();
            grid.set(0, 0, 1).unwrap();
            let next = next_generation(&grid, &ElementaryRule::new(2), 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
            let row: Vec<u8> = (0..5).map(|x| next.get(x, 0).unwrap()).collect();
            assert_eq!(row, vec![0, 0, 0, 0, 1], "{boundary:?}");
            if let Some(first) = &expected {
                assert_eq!(&row, first);
            }
            expected = Some(row);
        }
    }
}
