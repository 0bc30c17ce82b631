//! Error types for the `tessera-grid` crate.
//!
//! All fallible grid operations return [`GridError`] through the standard
//! [`Result`] type.

/// Errors that can occur while constructing or mutating a [`Grid`].
///
/// [`Grid`]: crate::Grid
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Width or height is zero, exceeds [`MAX_DIMENSION`], or the cell
    /// count overflows `usize`.
    ///
    /// [`MAX_DIMENSION`]: crate::MAX_DIMENSION
    #[error("invalid grid dimension {width}x{height}")]
    InvalidDimension {
        /// Requested width in cells.
        width: usize,
        /// Requested height in cells.
        height: usize,
    },

    /// A coordinate lies outside the grid.
    #[error("cell ({x}, {y}) is outside a {width}x{height} grid")]
    IndexOutOfBounds {
        /// Requested column.
        x: usize,
        /// Requested row.
        y: usize,
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },

    /// A buffer does not hold exactly `width * height` cells, or two grids
    /// that must share a shape do not.
    #[error("buffer size mismatch: expected {expected} cells, found {found}")]
    SizeMismatch {
        /// Number of cells the grid shape requires.
        expected: usize,
        /// Number of cells actually supplied.
        found: usize,
    },
}
