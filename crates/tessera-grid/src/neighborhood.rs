//! Neighborhood shapes: von Neumann, Moore, or a custom offset set.

use serde::{Deserialize, Serialize};

/// A relative cell offset `(dx, dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    /// Column delta.
    pub dx: i32,
    /// Row delta.
    pub dy: i32,
}

impl Offset {
    /// Create an offset.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Chebyshev length of the offset.
    pub const fn chebyshev(self) -> u32 {
        let ax = self.dx.unsigned_abs();
        let ay = self.dy.unsigned_abs();
        if ax > ay { ax } else { ay }
    }
}

/// Orthogonal neighbors in north, west, east, south order.
pub const VON_NEUMANN: [Offset; 4] = [
    Offset::new(0, -1),
    Offset::new(-1, 0),
    Offset::new(1, 0),
    Offset::new(0, 1),
];

/// All eight surrounding cells in row-major order.
pub const MOORE: [Offset; 8] = [
    Offset::new(-1, -1),
    Offset::new(0, -1),
    Offset::new(1, -1),
    Offset::new(-1, 0),
    Offset::new(1, 0),
    Offset::new(-1, 1),
    Offset::new(0, 1),
    Offset::new(1, 1),
];

/// The set of offsets a rule reads around each cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// 4 orthogonal neighbors.
    VonNeumann,
    /// 8 neighbors including diagonals.
    Moore,
    /// Any explicit offset list, in the order the rule expects.
    Custom(Vec<Offset>),
}

impl Neighborhood {
    /// The offsets of this neighborhood, in evaluation order.
    pub fn offsets(&self) -> &[Offset] {
        match self {
            Self::VonNeumann => &VON_NEUMANN,
            Self::Moore => &MOORE,
            Self::Custom(offsets) => offsets,
        }
    }

    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.offsets().len()
    }

    /// Return `true` for a custom neighborhood with no offsets.
    pub fn is_empty(&self) -> bool {
        self.offsets().is_empty()
    }

    /// Largest Chebyshev distance of any offset.
    pub fn radius(&self) -> u32 {
        self.offsets()
            .iter()
            .map(|o| o.chebyshev())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_shapes_have_expected_sizes() {
        assert_eq!(Neighborhood::VonNeumann.len(), 4);
        assert_eq!(Neighborhood::Moore.len(), 8);
        assert_eq!(Neighborhood::Moore.radius(), 1);
    }

    #[test]
    fn moore_excludes_center() {
        assert!(!MOORE.contains(&Offset::new(0, 0)));
    }

    #[test]
    fn custom_radius_uses_chebyshev_distance() {
        let hood = Neighborhood::Custom(vec![Offset::new(2, -1), Offset::new(0, 1)]);
        assert_eq!(hood.radius(), 2);
        assert!(!hood.is_empty());
    }
}
