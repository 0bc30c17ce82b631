//! The [`Grid`]: a flat, row-major cell buffer with a boundary policy.
//!
//! Cells are addressed by `(x, y)` with linear index `y * width + x`.
//! Direct access (`get`, `set`) is bounds-checked and reports misuse;
//! neighbor access always resolves through the [`Boundary`] and therefore
//! never leaves the grid.

use crate::boundary::Boundary;
use crate::error::GridError;
use crate::neighborhood::{Neighborhood, Offset};

/// Largest accepted width or height.
///
/// Keeps every coordinate representable as `i32` so offset arithmetic is
/// lossless.
pub const MAX_DIMENSION: usize = 1 << 16;

/// A rectangular buffer of cell values.
///
/// Invariant: `cells.len() == width * height`, `1 <= width, height <=
/// MAX_DIMENSION`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    boundary: Boundary,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid with every cell set to `fill`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimension`] if either dimension is zero
    /// or larger than [`MAX_DIMENSION`].
    pub fn new(width: usize, height: usize, boundary: Boundary, fill: T) -> Result<Self, GridError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            boundary,
            cells: vec![fill; len],
        })
    }

    /// Create a grid from an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimension`] for bad dimensions and
    /// [`GridError::SizeMismatch`] if `cells.len() != width * height`.
    pub fn from_cells(
        width: usize,
        height: usize,
        boundary: Boundary,
        cells: Vec<T>,
    ) -> Result<Self, GridError> {
        let len = checked_len(width, height)?;
        if cells.len() != len {
            return Err(GridError::SizeMismatch {
                expected: len,
                found: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            boundary,
            cells,
        })
    }

    /// Width in cells.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: a grid has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The boundary policy used for neighbor lookups.
    pub const fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Linear index of `(x, y)`, or `None` if outside the grid.
    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        y.checked_mul(self.width)?.checked_add(x)
    }

    /// Coordinates of a linear index, or `None` if out of range.
    pub fn coords(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.cells.len() {
            return None;
        }
        let x = index.checked_rem(self.width)?;
        let y = index.checked_div(self.width)?;
        Some((x, y))
    }

    /// Value at `(x, y)`, or `None` if outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        self.index(x, y).and_then(|i| self.cells.get(i).copied())
    }

    /// Value at a linear index, or `None` if out of range.
    pub fn get_index(&self, index: usize) -> Option<T> {
        self.cells.get(index).copied()
    }

    /// Overwrite the value at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::IndexOutOfBounds`] if `(x, y)` is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<(), GridError> {
        let out_of_bounds = GridError::IndexOutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        };
        let index = self.index(x, y).ok_or_else(|| out_of_bounds.clone())?;
        let slot = self.cells.get_mut(index).ok_or(out_of_bounds)?;
        *slot = value;
        Ok(())
    }

    /// Overwrite the value at a linear index.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::IndexOutOfBounds`] if the index is out of range.
    pub fn set_index(&mut self, index: usize, value: T) -> Result<(), GridError> {
        let (width, height) = (self.width, self.height);
        let slot = self.cells.get_mut(index).ok_or(GridError::IndexOutOfBounds {
            x: index.checked_rem(width).unwrap_or(0),
            y: index.checked_div(width).unwrap_or(0),
            width,
            height,
        })?;
        *slot = value;
        Ok(())
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Resolve `(x + dx, y + dy)` through the boundary policy.
    pub fn resolve(&self, x: usize, y: usize, offset: Offset) -> (usize, usize) {
        (
            self.boundary.resolve(x, offset.dx, self.width),
            self.boundary.resolve(y, offset.dy, self.height),
        )
    }

    /// `(x + dx, y + dy)` without applying the boundary policy, or `None`
    /// when it falls outside the grid.
    ///
    /// Used by rules that treat the border as a sink or a wall regardless
    /// of the grid's policy (sandpile, percolation search).
    pub fn offset_within(&self, x: usize, y: usize, offset: Offset) -> Option<(usize, usize)> {
        let nx = x
            .checked_add_signed(isize::try_from(offset.dx).ok()?)
            .filter(|&v| v < self.width)?;
        let ny = y
            .checked_add_signed(isize::try_from(offset.dy).ok()?)
            .filter(|&v| v < self.height)?;
        Some((nx, ny))
    }

    /// Linear index of the neighbor of `(x, y)` at `offset`.
    pub fn neighbor_index(&self, x: usize, y: usize, offset: Offset) -> usize {
        let (nx, ny) = self.resolve(x, y, offset);
        ny.saturating_mul(self.width).saturating_add(nx)
    }

    /// Value of the neighbor of `(x, y)` at `offset`.
    ///
    /// Returns `None` only if `(x, y)` itself is outside the grid.
    pub fn neighbor(&self, x: usize, y: usize, offset: Offset) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(self.neighbor_index(x, y, offset)).copied()
    }

    /// Iterate over the neighbor values of `(x, y)` in neighborhood order.
    ///
    /// Every offset resolves through the boundary policy, so the iterator
    /// yields exactly `neighborhood.len()` values for any in-grid cell.
    pub fn neighbors<'a>(
        &'a self,
        x: usize,
        y: usize,
        neighborhood: &'a Neighborhood,
    ) -> impl Iterator<Item = T> + 'a {
        self.neighbors_through(x, y, neighborhood, self.boundary)
    }

    /// Like [`Grid::neighbors`], but resolving offsets through `boundary`
    /// instead of the grid's own policy.
    pub fn neighbors_through<'a>(
        &'a self,
        x: usize,
        y: usize,
        neighborhood: &'a Neighborhood,
        boundary: Boundary,
    ) -> impl Iterator<Item = T> + 'a {
        let inside = x < self.width && y < self.height;
        neighborhood
            .offsets()
            .iter()
            .filter(move |_| inside)
            .filter_map(move |&offset| {
                let nx = boundary.resolve(x, offset.dx, self.width);
                let ny = boundary.resolve(y, offset.dy, self.height);
                self.get(nx, ny)
            })
    }

    /// Read-only view of the row-major buffer.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Mutable view of the row-major buffer.
    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Return `true` if `other` has the same width and height.
    pub const fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Exchange buffers with `other` in O(1).
    ///
    /// Used for double buffering: after a generation has been written into
    /// the scratch grid, swapping makes it current.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] if the shapes differ.
    pub fn swap_with(&mut self, other: &mut Self) -> Result<(), GridError> {
        if !self.same_shape(other) {
            return Err(GridError::SizeMismatch {
                expected: self.cells.len(),
                found: other.cells.len(),
            });
        }
        std::mem::swap(&mut self.cells, &mut other.cells);
        Ok(())
    }

    /// Iterate over `(x, y, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, &v)| {
            (
                i.checked_rem(width).unwrap_or(0),
                i.checked_div(width).unwrap_or(0),
                v,
            )
        })
    }

    /// Count cells matching a predicate.
    pub fn count(&self, mut predicate: impl FnMut(T) -> bool) -> usize {
        self.cells.iter().filter(|&&v| predicate(v)).count()
    }
}

/// Validate dimensions and compute `width * height`.
fn checked_len(width: usize, height: usize) -> Result<usize, GridError> {
    let invalid = GridError::InvalidDimension { width, height };
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(invalid);
    }
    width.checked_mul(height).ok_or(invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::neighborhood::MOORE;

    fn numbered(width: usize, height: usize, boundary: Boundary) -> Grid<usize> {
        let cells = (0..width * height).collect();
        Grid::from_cells(width, height, boundary, cells).unwrap()
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            Grid::new(0, 4, Boundary::Toroidal, 0_u8),
            Err(GridError::InvalidDimension { width: 0, height: 4 })
        );
        assert!(Grid::new(4, 0, Boundary::Clamped, 0_u8).is_err());
        assert!(Grid::new(MAX_DIMENSION + 1, 1, Boundary::Clamped, 0_u8).is_err());
    }

    #[test]
    fn from_cells_checks_length() {
        let result = Grid::from_cells(3, 3, Boundary::Toroidal, vec![0_u8; 8]);
        assert_eq!(
            result,
            Err(GridError::SizeMismatch {
                expected: 9,
                found: 8
            })
        );
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut grid = Grid::new(4, 3, Boundary::Toroidal, 0_u8).unwrap();
        grid.set(3, 2, 7).unwrap();
        assert_eq!(grid.get(3, 2), Some(7));
        assert_eq!(grid.get_index(11), Some(7));
        assert_eq!(grid.get(4, 0), None);
        assert!(grid.set(0, 3, 1).is_err());
    }

    #[test]
    fn coords_inverts_index() {
        let grid = Grid::new(5, 4, Boundary::Toroidal, 0_u8).unwrap();
        assert_eq!(grid.index(3, 2), Some(13));
        assert_eq!(grid.coords(13), Some((3, 2)));
        assert_eq!(grid.coords(20), None);
    }

    #[test]
    fn toroidal_corner_sees_opposite_corner() {
        let grid = numbered(4, 3, Boundary::Toroidal);
        let hood = Neighborhood::Moore;
        let values: Vec<usize> = grid.neighbors(0, 0, &hood).collect();
        assert_eq!(values.len(), 8);
        // (width-1, height-1) has linear index 11.
        assert!(values.contains(&11));
    }

    #[test]
    fn neighbors_through_overrides_the_grid_policy() {
        let grid = numbered(4, 3, Boundary::Clamped);
        let hood = Neighborhood::Custom(vec![Offset::new(-1, 0)]);
        assert_eq!(grid.neighbors(0, 1, &hood).collect::<Vec<_>>(), vec![4]);
        assert_eq!(
            grid.neighbors_through(0, 1, &hood, Boundary::Toroidal).collect::<Vec<_>>(),
            vec![7]
        );
        assert_eq!(grid.neighbors_through(4, 0, &hood, Boundary::Toroidal).count(), 0);
    }

    #[test]
    fn clamped_corner_reads_itself_for_outside_offsets() {
        let grid = numbered(3, 3, Boundary::Clamped);
        let values: Vec<usize> = grid.neighbors(0, 0, &Neighborhood::Moore).collect();
        // Offsets: (-1,-1) (0,-1) (1,-1) (-1,0) (1,0) (-1,1) (0,1) (1,1)
        assert_eq!(values, vec![0, 0, 1, 0, 1, 3, 3, 4]);
    }

    #[test]
    fn every_neighbor_resolves_inside_the_grid() {
        for boundary in [Boundary::Toroidal, Boundary::Clamped, Boundary::ZeroFlux] {
            let grid = numbered(3, 2, boundary);
            for (x, y, _) in grid.iter() {
                for offset in MOORE {
                    let (nx, ny) = grid.resolve(x, y, offset);
                    assert!(nx < 3 && ny < 2, "{boundary:?} ({x},{y}) {offset:?}");
                }
            }
        }
    }

    #[test]
    fn offset_within_ignores_boundary_policy() {
        let grid = numbered(3, 3, Boundary::Toroidal);
        assert_eq!(grid.offset_within(0, 0, Offset::new(-1, 0)), None);
        assert_eq!(grid.offset_within(2, 2, Offset::new(0, 1)), None);
        assert_eq!(grid.offset_within(1, 1, Offset::new(1, -1)), Some((2, 0)));
    }

    #[test]
    fn swap_exchanges_buffers() {
        let mut a = Grid::new(2, 2, Boundary::Toroidal, 1_u8).unwrap();
        let mut b = Grid::new(2, 2, Boundary::Toroidal, 2_u8).unwrap();
        a.swap_with(&mut b).unwrap();
        assert_eq!(a.cells(), &[2, 2, 2, 2]);
        assert_eq!(b.cells(), &[1, 1, 1, 1]);
    }

    #[test]
    fn swap_rejects_different_shapes() {
        let mut a = Grid::new(2, 2, Boundary::Toroidal, 1_u8).unwrap();
        let mut b = Grid::new(4, 1, Boundary::Toroidal, 2_u8).unwrap();
        assert!(a.swap_with(&mut b).is_err());
    }

    #[test]
    fn count_filters_cells() {
        let grid = numbered(3, 3, Boundary::Toroidal);
        assert_eq!(grid.count(|v| v % 2 == 0), 5);
    }
}
