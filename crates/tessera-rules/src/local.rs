//! Per-cell rules and the double-buffered generation step.
//!
//! A [`LocalRule`] maps a cell's current value and its neighbor values to
//! the cell's next value. [`write_generation`] evaluates the rule for every
//! cell of the *current* grid and writes results into a separate *next*
//! grid, so no cell ever observes a value produced earlier in the same
//! generation. The result is independent of the order cells are visited,
//! which [`Traversal`] lets callers (and tests) choose explicitly.

use serde::{Deserialize, Serialize};
use tessera_grid::{Boundary, Grid, Neighborhood};

use crate::error::RuleError;
use crate::random::CellRandom;

/// The computational shape of a per-cell rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleShape {
    /// Finite lookup over own state and neighbor states.
    Deterministic,
    /// Depends on the per-cell random sample.
    Stochastic,
    /// Discretized differential update over a continuous value.
    Continuous,
}

/// Everything a rule may read about the cell being updated besides values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellContext {
    /// Column of the cell.
    pub x: usize,
    /// Row of the cell.
    pub y: usize,
    /// Linear index `y * width + x`.
    pub index: usize,
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,
    /// Number of generations completed before this one.
    pub generation: u64,
    /// Per-cell random source for this generation.
    pub random: CellRandom,
}

impl CellContext {
    /// This cell's uniform sample in `[0, 1)`.
    pub const fn uniform(&self) -> f64 {
        self.random.uniform(self.index)
    }

    /// Return `true` for the last row of the grid.
    pub const fn is_last_row(&self) -> bool {
        self.y.saturating_add(1) == self.height
    }
}

/// A rule that computes each cell's next value from its neighborhood.
///
/// Implementations must be pure in `(cell, neighbors, ctx)`: identical
/// inputs always give identical outputs. Stochastic rules read their
/// randomness from [`CellContext::uniform`], never from ambient state.
pub trait LocalRule {
    /// The cell value type this rule operates on.
    type Cell: Copy + PartialEq;

    /// Which computational shape this rule has.
    fn shape(&self) -> RuleShape;

    /// The neighbor offsets the rule reads, in the order `apply` expects.
    fn neighborhood(&self) -> &Neighborhood;

    /// Edge policy for neighbor reads when the rule's geometry fixes one.
    /// `None` uses the grid's own boundary.
    fn boundary(&self) -> Option<Boundary> {
        None
    }

    /// Compute the next value of one cell.
    ///
    /// `neighbors` has exactly `self.neighborhood().len()` entries.
    fn apply(&self, cell: Self::Cell, neighbors: &[Self::Cell], ctx: &CellContext) -> Self::Cell;
}

/// Visiting order for a generation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Rows top to bottom, columns left to right.
    #[default]
    RowMajor,
    /// Columns left to right, rows top to bottom.
    ColumnMajor,
}

impl Traversal {
    /// Iterate over `(x, y)` coordinates of a `width x height` grid.
    pub fn coords(self, width: usize, height: usize) -> Box<dyn Iterator<Item = (usize, usize)>> {
        match self {
            Self::RowMajor => Box::new((0..height).flat_map(move |y| (0..width).map(move |x| (x, y)))),
            Self::ColumnMajor => {
                Box::new((0..width).flat_map(move |x| (0..height).map(move |y| (x, y))))
            }
        }
    }
}

/// Evaluate one generation of `rule` from `current` into `next`.
///
/// Returns the linear indices of cells whose value changed, in ascending
/// order regardless of traversal.
///
/// # Errors
///
/// Returns [`RuleError::InvariantViolation`] if the grids differ in shape
/// or a neighbor lookup yields fewer values than the neighborhood holds.
pub fn write_generation<R: LocalRule>(
    current: &Grid<R::Cell>,
    next: &mut Grid<R::Cell>,
    rule: &R,
    generation: u64,
    random: CellRandom,
    traversal: Traversal,
) -> Result<Vec<usize>, RuleError> {
    if !current.same_shape(next) {
        return Err(RuleError::invariant(format!(
            "double buffer shape mismatch: {}x{} vs {}x{}",
            current.width(),
            current.height(),
            next.width(),
            next.height()
        )));
    }

    let neighborhood = rule.neighborhood();
    let boundary = rule.boundary().unwrap_or_else(|| current.boundary());
    let expected = neighborhood.len();
    let mut scratch: Vec<R::Cell> = Vec::with_capacity(expected);
    let mut changed = Vec::new();
    let (width, height) = (current.width(), current.height());

    for (x, y) in traversal.coords(width, height) {
        let index = current
            .index(x, y)
            .ok_or_else(|| RuleError::invariant(format!("cell ({x}, {y}) outside grid")))?;
        let cell = current
            .get_index(index)
            .ok_or_else(|| RuleError::invariant(format!("no value at index {index}")))?;

        scratch.clear();
        scratch.extend(current.neighbors_through(x, y, neighborhood, boundary));
        if scratch.len() != expected {
            return Err(RuleError::invariant(format!(
                "cell ({x}, {y}) resolved {} of {expected} neighbors",
                scratch.len()
            )));
        }

        let ctx = CellContext {
            x,
            y,
            index,
            width,
            height,
            generation,
            random,
        };
        let value = rule.apply(cell, &scratch, &ctx);
        next.set_index(index, value)?;
        if value != cell {
            changed.push(index);
        }
    }

    if traversal != Traversal::RowMajor {
        changed.sort_unstable();
    }
    Ok(changed)
}

/// Compute the generation after `current` into a freshly allocated grid.
///
/// This is the pure form of a generation step: `current` is untouched.
///
/// # Errors
///
/// Propagates the errors of [`write_generation`].
pub fn next_generation<R: LocalRule>(
    current: &Grid<R::Cell>,
    rule: &R,
    generation: u64,
    random: CellRandom,
    traversal: Traversal,
) -> Result<Grid<R::Cell>, RuleError> {
    let mut next = current.clone();
    write_generation(current, &mut next, rule, generation, random, traversal)?;
    Ok(next)
}

/// A current/next grid pair for double-buffered stepping.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleBuffer<T> {
    current: Grid<T>,
    next: Grid<T>,
}

impl<T: Copy + PartialEq> DoubleBuffer<T> {
    /// Wrap `current`, allocating a scratch grid of the same shape.
    pub fn new(current: Grid<T>) -> Self {
        let next = current.clone();
        Self { current, next }
    }

    /// The grid holding the latest completed generation.
    pub const fn current(&self) -> &Grid<T> {
        &self.current
    }

    /// Mutable access to the current grid (seeding, stamping).
    pub const fn current_mut(&mut self) -> &mut Grid<T> {
        &mut self.current
    }

    /// Run one generation: write into the scratch grid, then swap.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`write_generation`].
    pub fn step<R: LocalRule<Cell = T>>(
        &mut self,
        rule: &R,
        generation: u64,
        random: CellRandom,
        traversal: Traversal,
    ) -> Result<Vec<usize>, RuleError> {
        let changed = write_generation(&self.current, &mut self.next, rule, generation, random, traversal)?;
        self.current.swap_with(&mut self.next)?;
        Ok(changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tessera_grid::Boundary;

    /// Sums the von Neumann neighbors; exposes any in-place update.
    struct NeighborSum {
        hood: Neighborhood,
    }

    impl LocalRule for NeighborSum {
        type Cell = u32;

        fn shape(&self) -> RuleShape {
            RuleShape::Deterministic
        }

        fn neighborhood(&self) -> &Neighborhood {
            &self.hood
        }

        fn apply(&self, _cell: u32, neighbors: &[u32], _ctx: &CellContext) -> u32 {
            neighbors.iter().sum()
        }
    }

    fn ramp(width: usize, height: usize) -> Grid<u32> {
        let cells = (0..u32::try_from(width * height).unwrap()).collect();
        Grid::from_cells(width, height, Boundary::Toroidal, cells).unwrap()
    }

    #[test]
    fn traversal_orders_cover_every_cell_once() {
        let mut row: Vec<_> = Traversal::RowMajor.coords(3, 2).collect();
        let mut col: Vec<_> = Traversal::ColumnMajor.coords(3, 2).collect();
        assert_eq!(row.len(), 6);
        assert_ne!(row, col);
        row.sort_unstable();
        col.sort_unstable();
        assert_eq!(row, col);
    }

    #[test]
    fn row_and_column_major_agree() {
        let rule = NeighborSum {
            hood: Neighborhood::VonNeumann,
        };
        let grid = ramp(7, 5);
        let random = CellRandom::new(1);
        let a = next_generation(&grid, &rule, 0, random, Traversal::RowMajor).unwrap();
        let b = next_generation(&grid, &rule, 0, random, Traversal::ColumnMajor).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn update_reads_only_previous_generation() {
        let rule = NeighborSum {
            hood: Neighborhood::VonNeumann,
        };
        let grid = ramp(3, 3);
        let next = next_generation(&grid, &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
        // Cell (1,1) sums 1 + 3 + 5 + 7 from the original grid.
        assert_eq!(next.get(1, 1), Some(16));
        // Cell (2,2): north 5, west 7, east (0,2)=6, south (2,0)=2.
        assert_eq!(next.get(2, 2), Some(20));
    }

    #[test]
    fn shape_mismatch_is_an_invariant_violation() {
        let rule = NeighborSum {
            hood: Neighborhood::VonNeumann,
        };
        let current = ramp(3, 3);
        let mut next = ramp(2, 2);
        let err = write_generation(&current, &mut next, &rule, 0, CellRandom::new(0), Traversal::RowMajor)
            .unwrap_err();
        assert!(matches!(err, RuleError::InvariantViolation { .. }));
    }

    #[test]
    fn double_buffer_reports_changed_cells() {
        let rule = NeighborSum {
            hood: Neighborhood::VonNeumann,
        };
        let grid = Grid::new(4, 4, Boundary::Toroidal, 0_u32).unwrap();
        let mut buffers = DoubleBuffer::new(grid);
        buffers.current_mut().set(1, 1, 1).unwrap();
        let changed = buffers
            .step(&rule, 0, CellRandom::new(0), Traversal::ColumnMajor)
            .unwrap();
        // The seed cell drops to 0 and its four neighbors rise to 1.
        assert_eq!(changed, vec![1, 4, 5, 6, 9]);
        assert_eq!(buffers.current().get(1, 0), Some(1));
    }
}
