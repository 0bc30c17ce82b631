//! Boundary resolution through the public `Grid` API.

#![allow(clippy::unwrap_used)]

use tessera_grid::{Boundary, Grid, Neighborhood, Offset};

#[test]
fn toroidal_origin_neighbors_include_far_corner() {
    for (width, height) in [(3, 3), (8, 5), (1, 4)] {
        let mut grid = Grid::new(width, height, Boundary::Toroidal, 0_u32).unwrap();
        grid.set(width - 1, height - 1, 42).unwrap();
        let values: Vec<u32> = grid.neighbors(0, 0, &Neighborhood::Moore).collect();
        assert!(values.contains(&42), "{width}x{height}");
    }
}

#[test]
fn zero_flux_mirrors_the_nearest_interior_value() {
    let cells: Vec<u32> = (0..9).collect();
    let grid = Grid::from_cells(3, 3, Boundary::ZeroFlux, cells).unwrap();
    // West of (0,1) mirrors onto the cell itself.
    assert_eq!(grid.neighbor(0, 1, Offset::new(-1, 0)), Some(3));
    // Two steps south of the bottom row mirrors one row up.
    assert_eq!(grid.neighbor(1, 2, Offset::new(0, 2)), Some(4));
}

#[test]
fn clamped_saturates_to_the_edge() {
    let cells: Vec<u32> = (0..12).collect();
    let grid = Grid::from_cells(4, 3, Boundary::Clamped, cells).unwrap();
    assert_eq!(grid.neighbor(3, 0, Offset::new(5, -5)), Some(3));
}

#[test]
fn neighbor_count_always_matches_the_neighborhood() {
    for boundary in [Boundary::Toroidal, Boundary::Clamped, Boundary::ZeroFlux] {
        let grid = Grid::new(2, 2, boundary, 0_u8).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(grid.neighbors(x, y, &Neighborhood::Moore).count(), 8);
                assert_eq!(grid.neighbors(x, y, &Neighborhood::VonNeumann).count(), 4);
            }
        }
    }
}
