//! Site percolation and a layer-by-layer breadth-first connectivity search.
//!
//! Cells are `u8`: [`BLOCKED`], [`OPEN`], or [`REACHED`]. The search starts
//! from every open cell of the top row and expands one BFS layer per
//! generation over orthogonal neighbors, never wrapping. The system
//! percolates when any reached cell lies in the bottom row.

use serde::{Deserialize, Serialize};
use tessera_grid::{Grid, VON_NEUMANN};

use crate::error::RuleError;

/// A closed site.
pub const BLOCKED: u8 = 0;
/// An open site not (yet) connected to the top row.
pub const OPEN: u8 = 1;
/// An open site connected to the top row.
pub const REACHED: u8 = 2;

/// Site percolation threshold of the square lattice.
pub const CRITICAL_PROBABILITY: f64 = 0.592_746;

/// Observable state of a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    /// The frontier is exhausted; further steps change nothing.
    pub bfs_done: bool,
    /// A reached cell touches the bottom row.
    pub percolates: bool,
    /// Number of reached cells.
    pub cluster_size: usize,
}

/// Incremental BFS from the top row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PercolationSearch {
    frontier: Vec<usize>,
    state: SearchState,
    started: bool,
}

impl PercolationSearch {
    /// A search that has not started yet.
    pub const fn new() -> Self {
        Self {
            frontier: Vec::new(),
            state: SearchState {
                bfs_done: false,
                percolates: false,
                cluster_size: 0,
            },
            started: false,
        }
    }

    /// Current observable state.
    pub const fn state(&self) -> SearchState {
        self.state
    }

    /// Whether [`start`](Self::start) has run.
    pub const fn started(&self) -> bool {
        self.started
    }

    /// Mark every open top-row cell as reached and make it the frontier.
    ///
    /// Returns the indices marked.
    pub fn start(&mut self, grid: &mut Grid<u8>) -> Result<Vec<usize>, RuleError> {
        self.frontier.clear();
        self.state = SearchState::default();
        self.started = true;

        let last_row = grid.height().saturating_sub(1);
        for x in 0..grid.width() {
            let index = grid
                .index(x, 0)
                .ok_or_else(|| RuleError::invariant(format!("top-row cell {x} outside grid")))?;
            if grid.get_index(index) == Some(OPEN) {
                grid.set_index(index, REACHED)?;
                self.frontier.push(index);
            }
        }
        self.state.cluster_size = self.frontier.len();
        self.state.percolates = last_row == 0 && !self.frontier.is_empty();
        self.state.bfs_done = self.frontier.is_empty();
        Ok(self.frontier.clone())
    }

    /// Expand the frontier by one BFS layer.
    ///
    /// Starts the search first if needed. Once the search is done this is a
    /// no-op returning no changes, so `percolates` can never flip back.
    pub fn step(&mut self, grid: &mut Grid<u8>) -> Result<Vec<usize>, RuleError> {
        if !self.started {
            return self.start(grid);
        }
        if self.state.bfs_done {
            return Ok(Vec::new());
        }

        let last_row = grid.height().saturating_sub(1);
        let mut next = Vec::new();
        for &index in &self.frontier {
            let (x, y) = grid
                .coords(index)
                .ok_or_else(|| RuleError::invariant(format!("frontier index {index} out of range")))?;
            for offset in VON_NEUMANN {
                let Some((nx, ny)) = grid.offset_within(x, y, offset) else {
                    continue;
                };
                let Some(neighbor) = grid.index(nx, ny) else {
                    continue;
                };
                if grid.get_index(neighbor) == Some(OPEN) {
                    grid.set_index(neighbor, REACHED)?;
                    next.push(neighbor);
                    if ny == last_row {
                        self.state.percolates = true;
                    }
                }
            }
        }

        self.state.cluster_size = self.state.cluster_size.saturating_add(next.len());
        self.state.bfs_done = next.is_empty();
        self.frontier.clone_from(&next);
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tessera_grid::Boundary;

    fn lattice(width: usize, rows: &[&[u8]]) -> Grid<u8> {
        let cells: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Grid::from_cells(width, rows.len(), Boundary::Clamped, cells).unwrap()
    }

    fn run_to_end(search: &mut PercolationSearch, grid: &mut Grid<u8>) -> usize {
        let mut steps = 0;
        while !search.state().bfs_done {
            search.step(grid).unwrap();
            steps += 1;
            assert!(steps < 1000, "search did not terminate");
        }
        steps
    }

    #[test]
    fn straight_column_percolates() {
        let mut grid = lattice(3, &[&[0, 1, 0], &[0, 1, 0], &[0, 1, 0]]);
        let mut search = PercolationSearch::new();
        run_to_end(&mut search, &mut grid);
        let state = search.state();
        assert!(state.percolates);
        assert_eq!(state.cluster_size, 3);
        assert_eq!(grid.get(1, 2), Some(REACHED));
    }

    #[test]
    fn blocked_row_stops_the_search() {
        let mut grid = lattice(3, &[&[1, 1, 1], &[0, 0, 0], &[1, 1, 1]]);
        let mut search = PercolationSearch::new();
        run_to_end(&mut search, &mut grid);
        assert!(!search.state().percolates);
        assert_eq!(search.state().cluster_size, 3);
        assert_eq!(grid.get(0, 2), Some(OPEN));
    }

    #[test]
    fn search_does_not_wrap() {
        // Only path would go through the left/right edge.
        let mut grid = lattice(3, &[&[1, 0, 0], &[0, 0, 1], &[0, 0, 1]]);
        let mut search = PercolationSearch::new();
        run_to_end(&mut search, &mut grid);
        assert!(!search.state().percolates);
    }

    #[test]
    fn empty_top_row_is_done_immediately() {
        let mut grid = lattice(2, &[&[0, 0], &[1, 1]]);
        let mut search = PercolationSearch::new();
        let marked = search.step(&mut grid).unwrap();
        assert!(marked.is_empty());
        assert!(search.state().bfs_done);
    }

    #[test]
    fn steps_after_done_change_nothing() {
        let mut grid = lattice(2, &[&[1, 0], &[1, 1]]);
        let mut search = PercolationSearch::new();
        run_to_end(&mut search, &mut grid);
        let before = (search.state(), grid.clone());
        for _ in 0..5 {
            assert!(search.step(&mut grid).unwrap().is_empty());
        }
        assert_eq!((search.state(), grid), before);
    }
}
