//! Boundary policies for neighbor lookups that fall outside the grid.
//!
//! Every neighbor lookup resolves through a [`Boundary`], so a resolved
//! coordinate is always inside `[0, dimension)`:
//!
//! | Policy     | `-1`  | `-2`  | `dim`     | `dim + 1` |
//! |------------|-------|-------|-----------|-----------|
//! | `Toroidal` | dim-1 | dim-2 | 0         | 1         |
//! | `Clamped`  | 0     | 0     | dim-1     | dim-1     |
//! | `ZeroFlux` | 0     | 1     | dim-1     | dim-2     |
//!
//! `ZeroFlux` reflects across the grid edge, so a ghost cell always takes
//! the value of the nearest interior cell. For a radius-1 stencil the flux
//! across the edge is zero and a diffusion update conserves total mass.

use serde::{Deserialize, Serialize};

/// Rule for resolving coordinates outside the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Wrap around: the grid is a torus.
    #[default]
    Toroidal,
    /// Saturate to the nearest edge cell.
    Clamped,
    /// Mirror across the edge (Neumann condition, no flux leaves the grid).
    ZeroFlux,
}

impl Boundary {
    /// Resolve `coord + delta` on an axis of length `dimension`.
    ///
    /// `dimension` must be at least 1 and at most [`MAX_DIMENSION`]; the
    /// grid constructors guarantee both.
    ///
    /// [`MAX_DIMENSION`]: crate::MAX_DIMENSION
    pub fn resolve(self, coord: usize, delta: i32, dimension: usize) -> usize {
        let Ok(dim) = i64::try_from(dimension) else {
            return 0;
        };
        if dim <= 0 {
            return 0;
        }
        let start = i64::try_from(coord).unwrap_or(0);
        let raw = start.saturating_add(i64::from(delta));
        let last = dim.saturating_sub(1);

        let resolved = match self {
            Self::Toroidal => raw.rem_euclid(dim),
            Self::Clamped => raw.clamp(0, last),
            Self::ZeroFlux => reflect(raw, dim),
        };
        usize::try_from(resolved).unwrap_or(0)
    }

    /// Return `true` if lookups wrap around the edges.
    pub const fn wraps(self) -> bool {
        matches!(self, Self::Toroidal)
    }
}

/// Half-sample symmetric reflection of `raw` into `[0, dim)`.
///
/// The pattern repeats with period `2 * dim`: `0..dim` maps to itself and
/// `dim..2*dim` maps back down to `dim-1..=0`.
fn reflect(raw: i64, dim: i64) -> i64 {
    let period = dim.saturating_mul(2);
    let folded = raw.rem_euclid(period);
    if folded < dim {
        folded
    } else {
        period.saturating_sub(1).saturating_sub(folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toroidal_wraps_both_edges() {
        assert_eq!(Boundary::Toroidal.resolve(0, -1, 5), 4);
        assert_eq!(Boundary::Toroidal.resolve(4, 1, 5), 0);
        assert_eq!(Boundary::Toroidal.resolve(0, -6, 5), 4);
        assert_eq!(Boundary::Toroidal.resolve(2, 0, 5), 2);
    }

    #[test]
    fn clamped_saturates() {
        assert_eq!(Boundary::Clamped.resolve(0, -1, 5), 0);
        assert_eq!(Boundary::Clamped.resolve(0, -3, 5), 0);
        assert_eq!(Boundary::Clamped.resolve(4, 1, 5), 4);
        assert_eq!(Boundary::Clamped.resolve(3, 1, 5), 4);
    }

    #[test]
    fn zero_flux_mirrors_nearest_interior() {
        assert_eq!(Boundary::ZeroFlux.resolve(0, -1, 5), 0);
        assert_eq!(Boundary::ZeroFlux.resolve(0, -2, 5), 1);
        assert_eq!(Boundary::ZeroFlux.resolve(4, 1, 5), 4);
        assert_eq!(Boundary::ZeroFlux.resolve(4, 2, 5), 3);
    }

    #[test]
    fn single_cell_axis_always_resolves_to_zero() {
        for boundary in [Boundary::Toroidal, Boundary::Clamped, Boundary::ZeroFlux] {
            for delta in -3..=3 {
                assert_eq!(boundary.resolve(0, delta, 1), 0);
            }
        }
    }

    #[test]
    fn boundary_deserializes_snake_case() {
        let b: Boundary = serde_json::from_str("\"zero_flux\"").unwrap_or_default();
        assert_eq!(b, Boundary::ZeroFlux);
    }
}
