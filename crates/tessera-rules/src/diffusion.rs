//! Heat diffusion on a scalar field.
//!
//! `u' = clamp(u + D * dt * lap(u), 0, 1)` with the 5-point Laplacian
//! `lap(u) = n + w + e + s - 4u`. Boundary behaviour comes from the grid:
//! a [`Boundary::ZeroFlux`](tessera_grid::Boundary::ZeroFlux) grid conserves
//! total heat.

use tessera_grid::Neighborhood;

use crate::error::RuleError;
use crate::local::{CellContext, LocalRule, RuleShape};

/// Largest `D * dt` for which the explicit scheme is stable in 2D.
pub const STABILITY_LIMIT: f32 = 0.25;

/// Explicit-Euler heat equation step.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionRule {
    coefficient: f32,
    dt: f32,
    neighborhood: Neighborhood,
}

impl DiffusionRule {
    /// Create a rule with diffusion coefficient `coefficient` and time step
    /// `dt`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] for non-finite or negative
    /// parameters, or when `coefficient * dt` exceeds [`STABILITY_LIMIT`].
    pub fn new(coefficient: f32, dt: f32) -> Result<Self, RuleError> {
        if !coefficient.is_finite() || !dt.is_finite() || coefficient < 0.0 || dt <= 0.0 {
            return Err(RuleError::invalid(format!(
                "diffusion needs finite D >= 0 and dt > 0, got D={coefficient} dt={dt}"
            )));
        }
        let rate = coefficient * dt;
        if rate > STABILITY_LIMIT {
            return Err(RuleError::invalid(format!(
                "diffusion D*dt = {rate} exceeds the stability limit {STABILITY_LIMIT}"
            )));
        }
        Ok(Self {
            coefficient,
            dt,
            neighborhood: Neighborhood::VonNeumann,
        })
    }

    /// The diffusion coefficient.
    pub const fn coefficient(&self) -> f32 {
        self.coefficient
    }

    /// The time step.
    pub const fn dt(&self) -> f32 {
        self.dt
    }
}

/// 5-point Laplacian from a center value and its four orthogonal neighbors.
pub fn laplacian(center: f32, neighbors: &[f32]) -> f32 {
    neighbors.iter().sum::<f32>() - 4.0 * center
}

/// Total heat in a field.
pub fn total_mass(cells: &[f32]) -> f64 {
    cells.iter().map(|&v| f64::from(v)).sum()
}

impl LocalRule for DiffusionRule {
    type Cell = f32;

    fn shape(&self) -> RuleShape {
        RuleShape::Continuous
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: f32, neighbors: &[f32], _ctx: &CellContext) -> f32 {
        let next = self.coefficient.mul_add(self.dt * laplacian(cell, neighbors), cell);
        next.clamp(0.0, 1.0)
    }
}
