//! Gray-Scott reaction-diffusion.
//!
//! Two chemicals `U` and `V` react as `U + 2V -> 3V` while `U` is fed in
//! at rate `f` and `V` is removed at rate `f + k`:
//!
//! ```text
//! dU/dt = Du lap(U) - U V^2 + f (1 - U)
//! dV/dt = Dv lap(V) + U V^2 - (f + k) V
//! ```
//!
//! Both concentrations are clamped to `[0, 1]` after every step.

use serde::{Deserialize, Serialize};
use tessera_grid::Neighborhood;

use crate::diffusion::laplacian;
use crate::error::RuleError;
use crate::local::{CellContext, LocalRule, RuleShape};

/// Concentrations of the two chemicals in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chemicals {
    /// Substrate concentration.
    pub u: f32,
    /// Activator concentration.
    pub v: f32,
}

impl Chemicals {
    /// Fully fed, activator-free cell.
    pub const RESTING: Self = Self { u: 1.0, v: 0.0 };

    /// Create a cell with the given concentrations.
    pub const fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Named feed/kill parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrayScottPreset {
    /// Isolated self-replicating spots.
    Spots,
    /// Parallel stripes.
    Stripes,
    /// Labyrinthine maze.
    Maze,
}

impl GrayScottPreset {
    /// All presets, in showcase order.
    pub const ALL: [Self; 3] = [Self::Spots, Self::Stripes, Self::Maze];

    /// `(feed, kill)` for this preset.
    pub const fn feed_kill(self) -> (f32, f32) {
        match self {
            Self::Spots => (0.035, 0.065),
            Self::Stripes => (0.060, 0.062),
            Self::Maze => (0.029, 0.057),
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Spots => "Spots",
            Self::Stripes => "Stripes",
            Self::Maze => "Maze",
        }
    }
}

/// Parameters of a Gray-Scott system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrayScottParams {
    /// Feed rate `f`.
    pub feed: f32,
    /// Kill rate `k`.
    pub kill: f32,
    /// Diffusion rate of `U`.
    pub diffusion_u: f32,
    /// Diffusion rate of `V`.
    pub diffusion_v: f32,
    /// Time step.
    pub dt: f32,
}

impl GrayScottParams {
    /// Parameters for a preset with the standard diffusion rates.
    pub const fn preset(preset: GrayScottPreset) -> Self {
        let (feed, kill) = preset.feed_kill();
        Self {
            feed,
            kill,
            diffusion_u: 0.16,
            diffusion_v: 0.08,
            dt: 1.0,
        }
    }
}

impl Default for GrayScottParams {
    fn default() -> Self {
        Self::preset(GrayScottPreset::Spots)
    }
}

/// One explicit-Euler Gray-Scott step per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayScottRule {
    params: GrayScottParams,
    neighborhood: Neighborhood,
}

impl GrayScottRule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] for non-finite or negative
    /// rates, a non-positive time step, or an unstable diffusion rate
    /// (`D * dt > 0.25`).
    pub fn new(params: GrayScottParams) -> Result<Self, RuleError> {
        let GrayScottParams {
            feed,
            kill,
            diffusion_u,
            diffusion_v,
            dt,
        } = params;
        let rates = [feed, kill, diffusion_u, diffusion_v];
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0) || !dt.is_finite() || dt <= 0.0 {
            return Err(RuleError::invalid(format!(
                "gray-scott rates must be finite and non-negative with dt > 0: {params:?}"
            )));
        }
        if diffusion_u.max(diffusion_v) * dt > crate::diffusion::STABILITY_LIMIT {
            return Err(RuleError::invalid(format!(
                "gray-scott diffusion rate {} * dt {dt} is unstable",
                diffusion_u.max(diffusion_v)
            )));
        }
        Ok(Self {
            params,
            neighborhood: Neighborhood::VonNeumann,
        })
    }

    /// The parameters in effect.
    pub const fn params(&self) -> GrayScottParams {
        self.params
    }
}

/// Mean `V` concentration.
pub fn mean_v(cells: &[Chemicals]) -> f64 {
    if cells.is_empty() {
        return 0.0;
    }
    let sum: f64 = cells.iter().map(|c| f64::from(c.v)).sum();
    let n = u32::try_from(cells.len()).map_or(f64::from(u32::MAX), f64::from);
    sum / n
}

impl LocalRule for GrayScottRule {
    type Cell = Chemicals;

    fn shape(&self) -> RuleShape {
        RuleShape::Continuous
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: Chemicals, neighbors: &[Chemicals], _ctx: &CellContext) -> Chemicals {
        let p = &self.params;
        let mut us = [0.0_f32; 4];
        let mut vs = [0.0_f32; 4];
        for ((u, v), n) in us.iter_mut().zip(vs.iter_mut()).zip(neighbors) {
            *u = n.u;
            *v = n.v;
        }
        let lap_u = laplacian(cell.u, &us);
        let lap_v = laplacian(cell.v, &vs);
        let uvv = cell.u * cell.v * cell.v;

        let du = p.diffusion_u * lap_u - uvv + p.feed * (1.0 - cell.u);
        let dv = p.diffusion_v * lap_v + uvv - (p.feed + p.kill) * cell.v;
        Chemicals {
            u: p.dt.mul_add(du, cell.u).clamp(0.0, 1.0),
            v: p.dt.mul_add(dv, cell.v).clamp(0.0, 1.0),
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
    fn presets_match_known_parameters() {
        let spots = GrayScottParams::preset(GrayScottPreset::Spots);
        assert!((spots.feed - 0.035).abs() < 1e-6);
        assert!((spots.kill - 0.065).abs() < 1e-6);
        assert_eq!(GrayScottPreset::Maze.label(), "Maze");
    }

    #[test]
    fn resting_state_is_a_fixed_point() {
        let rule = GrayScottRule::new(GrayScottParams::default()).unwrap();
        let grid = Grid::new(6, 6, Boundary::Toroidal, Chemicals::RESTING).unwrap();
        let next = next_generation(&grid, &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
        assert_eq!(next, grid);
    }

    #[test]
    fn activator_patch_reacts() {
        let rule = GrayScottRule::new(GrayScottParams::default()).unwrap();
        let mut grid = Grid::new(8, 8, Boundary::Toroidal, Chemicals::RESTING).unwrap();
        grid.set(4, 4, Chemicals::new(0.5, 0.25)).unwrap();
        let next = next_generation(&grid, &rule, 0, CellRandom::new(0), Traversal::RowMajor).unwrap();
        let center = next.get(4, 4).unwrap();
        assert!(center.v > 0.0 && center.v <= 1.0);
        // Activator diffuses to the neighbors.
        assert!(next.get(4, 3).unwrap().v > 0.0);
    }

    #[test]
    fn unstable_parameters_are_rejected() {
        let mut params = GrayScottParams::default();
        params.diffusion_u = 0.5;
        assert!(GrayScottRule::new(params).is_err());
        params = GrayScottParams::default();
        params.feed = -0.1;
        assert!(GrayScottRule::new(params).is_err());
    }

    #[test]
    fn mean_v_averages_activator() {
        let cells = [Chemicals::new(1.0, 0.0), Chemicals::new(0.5, 0.5)];
        assert!((mean_v(&cells) - 0.25).abs() < 1e-9);
    }
}
