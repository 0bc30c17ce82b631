//! 2D Ising model with Metropolis acceptance.
//!
//! Spins are stored as `u8`: `0` is down (-1), anything else is up (+1).
//! The critical temperature of the square lattice with unit coupling is
//! [`CRITICAL_TEMPERATURE`].

use tessera_grid::Neighborhood;

use crate::error::RuleError;
use crate::local::{CellContext, LocalRule, RuleShape};

/// Spin-down cell value.
pub const DOWN: u8 = 0;
/// Spin-up cell value.
pub const UP: u8 = 1;

/// Onsager's critical temperature `2 / ln(1 + sqrt 2)`.
pub const CRITICAL_TEMPERATURE: f64 = 2.269_185_314_213_022;

/// Metropolis update at a fixed temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct IsingRule {
    temperature: f64,
    checkerboard: bool,
    neighborhood: Neighborhood,
}

impl IsingRule {
    /// Create a rule at `temperature`.
    ///
    /// With `checkerboard` set, only cells where `(x + y + generation)` is
    /// even may flip in a given generation.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] unless `temperature` is finite
    /// and positive.
    pub fn new(temperature: f64, checkerboard: bool) -> Result<Self, RuleError> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(RuleError::invalid(format!(
                "ising temperature must be positive, got {temperature}"
            )));
        }
        Ok(Self {
            temperature,
            checkerboard,
            neighborhood: Neighborhood::VonNeumann,
        })
    }

    /// Current temperature.
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Whether the checkerboard sublattice schedule is on.
    pub const fn checkerboard(&self) -> bool {
        self.checkerboard
    }

    /// Energy change of flipping a spin with the given neighbor sum.
    pub fn flip_energy(spin: i32, neighbor_sum: i32) -> f64 {
        f64::from(spin.saturating_mul(neighbor_sum).saturating_mul(2))
    }

    /// Metropolis acceptance for an energy change and a uniform sample.
    pub fn accepts(&self, delta_energy: f64, sample: f64) -> bool {
        delta_energy <= 0.0 || sample < (-delta_energy / self.temperature).exp()
    }
}

/// `+1` for up, `-1` for down.
pub const fn spin(cell: u8) -> i32 {
    if cell == DOWN { -1 } else { 1 }
}

/// Magnetization `|sum s| / N` of a spin buffer, in `[0, 1]`.
pub fn magnetization(cells: &[u8]) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    let sum = cells
        .iter()
        .fold(0_i64, |acc, &c| acc.saturating_add(i64::from(spin(c))));
    let n = u32::try_from(cells.len()).map_or(f64::from(u32::MAX), f64::from);
    let total = i32::try_from(sum.unsigned_abs()).map_or(f64::from(i32::MAX), f64::from);
    total / n
}

impl LocalRule for IsingRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Stochastic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: u8, neighbors: &[u8], ctx: &CellContext) -> u8 {
        if self.checkerboard {
            let parity = (ctx.x as u64)
                .wrapping_add(ctx.y as u64)
                .wrapping_add(ctx.generation);
            if parity & 1 != 0 {
                return cell;
            }
        }
        let s = spin(cell);
        let sum = neighbors
            .iter()
            .fold(0_i32, |acc, &n| acc.saturating_add(spin(n)));
        let delta = Self::flip_energy(s, sum);
        if self.accepts(delta, ctx.uniform()) {
            if cell == DOWN { UP } else { DOWN }
        } else {
            cell
        }
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
    fn critical_temperature_matches_closed_form() {
        let exact = 2.0 / (1.0 + 2.0_f64.sqrt()).ln();
        assert!((CRITICAL_TEMPERATURE - exact).abs() < 1e-12);
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        assert!(IsingRule::new(0.0, false).is_err());
        assert!(IsingRule::new(-1.0, false).is_err());
        assert!(IsingRule::new(f64::NAN, false).is_err());
    }

    #[test]
    fn energy_lowering_flips_always_accepted() {
        let rule = IsingRule::new(0.01, false).unwrap();
        // Up spin surrounded by down spins: flipping lowers energy.
        assert!(rule.accepts(IsingRule::flip_energy(1, -4), 0.999));
        // Aligned spin at near-zero temperature essentially never flips.
        assert!(!rule.accepts(IsingRule::flip_energy(1, 4), 0.000_001));
    }

    #[test]
    fn magnetization_of_uniform_and_mixed_grids() {
        assert!((magnetization(&[UP; 16]) - 1.0).abs() < 1e-12);
        assert!((magnetization(&[DOWN; 16]) - 1.0).abs() < 1e-12);
        assert!(magnetization(&[UP, DOWN, UP, DOWN]).abs() < 1e-12);
    }

    #[test]
    fn same_seed_gives_same_generation() {
        let mut grid = Grid::new(16, 16, Boundary::Toroidal, DOWN).unwrap();
        for i in (0..256).step_by(3) {
            grid.set_index(i, UP).unwrap();
        }
        let rule = IsingRule::new(CRITICAL_TEMPERATURE, false).unwrap();
        let a = next_generation(&grid, &rule, 4, CellRandom::new(77), Traversal::RowMajor).unwrap();
        let b = next_generation(&grid, &rule, 4, CellRandom::new(77), Traversal::ColumnMajor).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn checkerboard_freezes_odd_sublattice() {
        let grid = Grid::new(4, 4, Boundary::Toroidal, DOWN).unwrap();
        // Very hot: almost every eligible spin flips.
        let rule = IsingRule::new(1.0e6, true).unwrap();
        let next = next_generation(&grid, &rule, 0, CellRandom::new(5), Traversal::RowMajor).unwrap();
        for (x, y, v) in next.iter() {
            if (x + y) % 2 == 1 {
                assert_eq!(v, DOWN, "({x},{y}) is off-parity");
            }
        }
    }
}
