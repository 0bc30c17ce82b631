//! Abelian sandpile: drop grains, then relax until every cell is stable.
//!
//! Unlike the per-cell rules, a sandpile generation is a closure over the
//! whole grid: a drop may trigger a cascade of topplings that runs to
//! completion in place. Grains pushed past the border are lost, which
//! guarantees that relaxation terminates.

use serde::{Deserialize, Serialize};
use tessera_grid::{Grid, VON_NEUMANN};

use crate::error::RuleError;

/// Grains a cell can hold before it topples.
pub const DEFAULT_CAPACITY: u32 = 4;

/// Outcome of one relaxation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relaxation {
    /// Number of toppling events (the avalanche size).
    pub topplings: u64,
    /// Grains that fell off the border.
    pub grains_lost: u64,
}

/// A whole-grid rule that perturbs the grid and then relaxes it in place.
pub trait RelaxationRule {
    /// The cell value type this rule operates on.
    type Cell: Copy;

    /// Apply the external event that starts a generation (e.g. a drop).
    fn perturb(&self, grid: &mut Grid<Self::Cell>) -> Result<(), RuleError>;

    /// Redistribute until no cell is over threshold.
    fn relax(&self, grid: &mut Grid<Self::Cell>) -> Result<Relaxation, RuleError>;
}

/// Where grains are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSite {
    /// The middle cell.
    #[default]
    Center,
    /// An explicit cell.
    At {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },
}

impl DropSite {
    /// Resolve to coordinates for a grid of the given size.
    pub const fn resolve(self, width: usize, height: usize) -> (usize, usize) {
        match self {
            Self::Center => (width / 2, height / 2),
            Self::At { x, y } => (x, y),
        }
    }
}

/// Bak-Tang-Wiesenfeld sandpile on the von Neumann neighborhood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandpileRule {
    capacity: u32,
    grains: u32,
    site: DropSite,
}

impl SandpileRule {
    /// Create a sandpile dropping `grains` grains at `site` per generation.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] if `capacity` is below the
    /// neighborhood size (4) or `grains` is zero.
    pub fn new(capacity: u32, grains: u32, site: DropSite) -> Result<Self, RuleError> {
        if capacity < DEFAULT_CAPACITY {
            return Err(RuleError::invalid(format!(
                "sandpile capacity must be at least {DEFAULT_CAPACITY}, got {capacity}"
            )));
        }
        if grains == 0 {
            return Err(RuleError::invalid("sandpile must drop at least one grain"));
        }
        Ok(Self {
            capacity,
            grains,
            site,
        })
    }

    /// Toppling threshold.
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Grains added per generation.
    pub const fn grains(&self) -> u32 {
        self.grains
    }

    /// The drop site.
    pub const fn site(&self) -> DropSite {
        self.site
    }

    /// Grains that spill to each neighbor when a cell holding `value`
    /// topples (every full multiple of the capacity at once).
    pub fn share(&self, value: u32) -> u32 {
        value.checked_div(self.capacity).unwrap_or(0)
    }
}

impl Default for SandpileRule {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            grains: 1,
            site: DropSite::Center,
        }
    }
}

impl RelaxationRule for SandpileRule {
    type Cell = u32;

    fn perturb(&self, grid: &mut Grid<u32>) -> Result<(), RuleError> {
        let (x, y) = self.site.resolve(grid.width(), grid.height());
        let current = grid.get(x, y).ok_or_else(|| {
            RuleError::invalid(format!(
                "drop site ({x}, {y}) outside {}x{} grid",
                grid.width(),
                grid.height()
            ))
        })?;
        grid.set(x, y, current.saturating_add(self.grains))?;
        Ok(())
    }

    fn relax(&self, grid: &mut Grid<u32>) -> Result<Relaxation, RuleError> {
        let mut outcome = Relaxation::default();
        let mut pending: Vec<usize> = grid
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= self.capacity)
            .map(|(i, _)| i)
            .collect();

        while let Some(index) = pending.pop() {
            let value = grid
                .get_index(index)
                .ok_or_else(|| RuleError::invariant(format!("pending index {index} out of range")))?;
            let share = self.share(value);
            if share == 0 {
                continue;
            }
            let remainder = value.checked_rem(self.capacity).unwrap_or(0);
            grid.set_index(index, remainder)?;
            outcome.topplings = outcome.topplings.saturating_add(u64::from(share));

            let (x, y) = grid
                .coords(index)
                .ok_or_else(|| RuleError::invariant(format!("index {index} has no coordinates")))?;
            for offset in VON_NEUMANN {
                let Some((nx, ny)) = grid.offset_within(x, y, offset) else {
                    outcome.grains_lost = outcome.grains_lost.saturating_add(u64::from(share));
                    continue;
                };
                let neighbor = grid
                    .index(nx, ny)
                    .ok_or_else(|| RuleError::invariant(format!("neighbor ({nx}, {ny}) outside grid")))?;
                let before = grid.get_index(neighbor).unwrap_or(0);
                let after = before.saturating_add(share);
                grid.set_index(neighbor, after)?;
                if before < self.capacity && after >= self.capacity {
                    pending.push(neighbor);
                }
            }
        }
        Ok(outcome)
    }
}

/// Running totals across generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvalancheStats {
    /// Grains dropped so far.
    pub grains_dropped: u64,
    /// Largest single avalanche so far.
    pub largest: u64,
    /// Grains lost over the border so far.
    pub grains_lost: u64,
}

impl AvalancheStats {
    /// Fold one relaxation into the totals.
    pub fn record(&mut self, grains: u32, relaxation: Relaxation) {
        self.grains_dropped = self.grains_dropped.saturating_add(u64::from(grains));
        self.largest = self.largest.max(relaxation.topplings);
        self.grains_lost = self.grains_lost.saturating_add(relaxation.grains_lost);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tessera_grid::Boundary;

    fn pile(size: usize) -> Grid<u32> {
        Grid::new(size, size, Boundary::Clamped, 0).unwrap()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(SandpileRule::new(3, 1, DropSite::Center).is_err());
        assert!(SandpileRule::new(4, 0, DropSite::Center).is_err());
    }

    #[test]
    fn single_topple_spreads_to_four_neighbors() {
        let rule = SandpileRule::default();
        let mut grid = pile(3);
        grid.set(1, 1, 4).unwrap();
        let outcome = rule.relax(&mut grid).unwrap();
        assert_eq!(outcome.topplings, 1);
        assert_eq!(outcome.grains_lost, 0);
        assert_eq!(grid.cells(), &[0, 1, 0, 1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn corner_topple_loses_grains_at_the_border() {
        let rule = SandpileRule::default();
        let mut grid = pile(3);
        grid.set(0, 0, 4).unwrap();
        let outcome = rule.relax(&mut grid).unwrap();
        assert_eq!(outcome.grains_lost, 2);
        assert_eq!(grid.cells().iter().sum::<u32>(), 2);
    }

    #[test]
    fn multiple_of_capacity_topples_in_one_event() {
        let rule = SandpileRule::default();
        let mut grid = pile(5);
        grid.set(2, 2, 9).unwrap();
        let outcome = rule.relax(&mut grid).unwrap();
        assert!(outcome.topplings >= 2);
        assert!(grid.cells().iter().all(|&v| v < 4));
    }

    #[test]
    fn grains_are_conserved_or_lost() {
        let rule = SandpileRule::new(4, 50, DropSite::Center).unwrap();
        let mut grid = pile(7);
        let mut lost = 0;
        for _ in 0..20 {
            rule.perturb(&mut grid).unwrap();
            lost += rule.relax(&mut grid).unwrap().grains_lost;
        }
        let held: u64 = grid.cells().iter().map(|&v| u64::from(v)).sum();
        assert_eq!(held + lost, 1000);
    }

    #[test]
    fn drop_site_outside_grid_is_rejected() {
        let rule = SandpileRule::new(4, 1, DropSite::At { x: 9, y: 0 }).unwrap();
        assert!(rule.perturb(&mut pile(3)).is_err());
    }

    #[test]
    fn stats_track_largest_avalanche() {
        let mut stats = AvalancheStats::default();
        stats.record(1, Relaxation { topplings: 5, grains_lost: 1 });
        stats.record(1, Relaxation { topplings: 2, grains_lost: 0 });
        assert_eq!(stats.largest, 5);
        assert_eq!(stats.grains_dropped, 2);
        assert_eq!(stats.grains_lost, 1);
    }
}
