//! Built-in pattern library and stamping.
//!
//! Patterns are lists of `(dx, dy, state)` relative to their own bounding
//! box. Stamping wraps on toroidal grids and clips on every other boundary.

use serde::{Deserialize, Serialize};
use tessera_grid::Grid;
use tessera_rules::multistate::wire;

/// A pattern cell: column offset, row offset, state.
pub type PatternCell = (i32, i32, u8);

/// Names accepted by [`named`].
pub const NAMES: [&str; 6] = [
    "glider",
    "gosper_glider_gun",
    "r_pentomino",
    "acorn",
    "highlife_replicator",
    "wireworld_loop",
];

const GLIDER: [(i32, i32); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

const GOSPER_GLIDER_GUN: [(i32, i32); 36] = [
    (1, 5),
    (2, 5),
    (1, 6),
    (2, 6),
    (11, 5),
    (11, 6),
    (11, 7),
    (12, 4),
    (12, 8),
    (13, 3),
    (13, 9),
    (14, 3),
    (14, 9),
    (15, 6),
    (16, 4),
    (16, 8),
    (17, 5),
    (17, 6),
    (17, 7),
    (18, 6),
    (21, 3),
    (21, 4),
    (21, 5),
    (22, 3),
    (22, 4),
    (22, 5),
    (23, 2),
    (23, 6),
    (25, 1),
    (25, 2),
    (25, 6),
    (25, 7),
    (35, 3),
    (35, 4),
    (36, 3),
    (36, 4),
];

const R_PENTOMINO: [(i32, i32); 5] = [(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)];

const ACORN: [(i32, i32); 7] = [(1, 0), (3, 1), (0, 2), (1, 2), (4, 2), (5, 2), (6, 2)];

const HIGHLIFE_REPLICATOR: [(i32, i32); 21] = [
    (3, 0),
    (4, 0),
    (5, 0),
    (6, 0),
    (7, 0),
    (2, 1),
    (7, 1),
    (1, 2),
    (7, 2),
    (0, 3),
    (7, 3),
    (0, 4),
    (6, 4),
    (0, 5),
    (5, 5),
    (0, 6),
    (1, 7),
    (2, 7),
    (3, 7),
    (4, 7),
    (5, 7),
];

const LOOP_WIDTH: i32 = 24;
const LOOP_HEIGHT: i32 = 9;

/// Where a pattern's bounding box is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Centered on the grid.
    #[default]
    Center,
    /// Horizontally centered on the bottom row.
    BottomCenter,
    /// Top-left corner of the bounding box at this cell.
    At {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
}

/// Look up a built-in pattern by name.
pub fn named(name: &str) -> Option<Vec<PatternCell>> {
    let live = |cells: &[(i32, i32)]| -> Vec<PatternCell> { cells.iter().map(|&(x, y)| (x, y, 1)).collect() };
    match name {
        "glider" => Some(live(&GLIDER)),
        "gosper_glider_gun" => Some(live(&GOSPER_GLIDER_GUN)),
        "r_pentomino" => Some(live(&R_PENTOMINO)),
        "acorn" => Some(live(&ACORN)),
        "highlife_replicator" => Some(live(&HIGHLIFE_REPLICATOR)),
        "wireworld_loop" => Some(wireworld_loop()),
        _ => None,
    }
}

/// A rectangular conductor loop carrying two electrons.
fn wireworld_loop() -> Vec<PatternCell> {
    let right = LOOP_WIDTH.saturating_sub(1);
    let bottom = LOOP_HEIGHT.saturating_sub(1);
    let mut cells = Vec::new();
    for x in 0..LOOP_WIDTH {
        cells.push((x, 0, wire::CONDUCTOR));
        cells.push((x, bottom, wire::CONDUCTOR));
    }
    for y in 1..bottom {
        cells.push((0, y, wire::CONDUCTOR));
        cells.push((right, y, wire::CONDUCTOR));
    }
    let signals = [
        (2, 0, wire::HEAD),
        (1, 0, wire::TAIL),
        (right.saturating_sub(4), bottom, wire::HEAD),
        (right.saturating_sub(5), bottom, wire::TAIL),
    ];
    for (x, y, state) in signals {
        if let Some(cell) = cells.iter_mut().find(|c| c.0 == x && c.1 == y) {
            cell.2 = state;
        }
    }
    cells
}

/// Minimum corner of the bounding box, then its width and height.
fn bounds(cells: &[PatternCell]) -> (i64, i64, i64, i64) {
    let min_x = cells.iter().map(|c| i64::from(c.0)).min().unwrap_or(0);
    let max_x = cells.iter().map(|c| i64::from(c.0)).max().unwrap_or(0);
    let min_y = cells.iter().map(|c| i64::from(c.1)).min().unwrap_or(0);
    let max_y = cells.iter().map(|c| i64::from(c.1)).max().unwrap_or(0);
    (
        min_x,
        min_y,
        max_x.saturating_sub(min_x).saturating_add(1),
        max_y.saturating_sub(min_y).saturating_add(1),
    )
}

/// Write `cells` into `grid` at `anchor`.
///
/// Returns the number of cells written; cells clipped by a non-wrapping
/// boundary are skipped.
pub fn stamp(grid: &mut Grid<u8>, cells: &[PatternCell], anchor: Anchor) -> usize {
    let width = i64::try_from(grid.width()).unwrap_or(i64::MAX);
    let height = i64::try_from(grid.height()).unwrap_or(i64::MAX);
    let (min_x, min_y, box_w, box_h) = bounds(cells);
    let (origin_x, origin_y) = match anchor {
        Anchor::Center => (
            width.saturating_sub(box_w) / 2,
            height.saturating_sub(box_h) / 2,
        ),
        Anchor::BottomCenter => (width.saturating_sub(box_w) / 2, height.saturating_sub(box_h)),
        Anchor::At { x, y } => (i64::from(x), i64::from(y)),
    };
    let wraps = grid.boundary().wraps();

    let mut written = 0_usize;
    for &(dx, dy, state) in cells {
        let x = origin_x.saturating_add(i64::from(dx)).saturating_sub(min_x);
        let y = origin_y.saturating_add(i64::from(dy)).saturating_sub(min_y);
        let (x, y) = if wraps {
            (x.rem_euclid(width), y.rem_euclid(height))
        } else {
            (x, y)
        };
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            continue;
        };
        if grid.set(x, y, state).is_ok() {
            written = written.saturating_add(1);
        }
    }
    written
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tessera_grid::Boundary;

    #[test]
    fn every_name_resolves() {
        for name in NAMES {
            assert!(named(name).is_some_and(|cells| !cells.is_empty()), "{name}");
        }
        assert!(named("spaceship").is_none());
    }

    #[test]
    fn center_anchor_centers_the_bounding_box() {
        let mut grid = Grid::new(9, 9, Boundary::Clamped, 0_u8).unwrap();
        let written = stamp(&mut grid, &named("r_pentomino").unwrap(), Anchor::Center);
        assert_eq!(written, 5);
        // 3x3 box centered at (3..6, 3..6).
        assert_eq!(grid.get(4, 3), Some(1));
        assert_eq!(grid.get(3, 4), Some(1));
        assert_eq!(grid.get(4, 5), Some(1));
    }

    #[test]
    fn stamping_wraps_on_a_torus_and_clips_otherwise() {
        let glider = named("glider").unwrap();
        let anchor = Anchor::At { x: -1, y: -1 };

        let mut torus = Grid::new(6, 6, Boundary::Toroidal, 0_u8).unwrap();
        assert_eq!(stamp(&mut torus, &glider, anchor), 5);
        assert_eq!(torus.get(0, 5), Some(1));

        let mut clipped = Grid::new(6, 6, Boundary::Clamped, 0_u8).unwrap();
        assert_eq!(stamp(&mut clipped, &glider, anchor), 3);
    }

    #[test]
    fn wireworld_loop_carries_two_electrons() {
        let cells = named("wireworld_loop").unwrap();
        let heads = cells.iter().filter(|c| c.2 == wire::HEAD).count();
        let tails = cells.iter().filter(|c| c.2 == wire::TAIL).count();
        assert_eq!((heads, tails), (2, 2));
    }
}
