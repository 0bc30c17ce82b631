//! Cell storage for the Tessera simulation engine.
//!
//! A [`Grid`] owns a flat row-major buffer of cell values together with a
//! [`Boundary`] policy. Neighbor lookups always resolve through the policy,
//! so rules composed on top of a grid can never read outside it.
//!
//! # Modules
//!
//! - [`boundary`] -- Toroidal, clamped, and zero-flux coordinate resolution.
//! - [`error`] -- [`GridError`] for construction and access failures.
//! - [`grid`] -- The [`Grid`] buffer with O(1) buffer swapping.
//! - [`neighborhood`] -- von Neumann, Moore, and custom offset sets.

pub mod boundary;
pub mod error;
pub mod grid;
pub mod neighborhood;

pub use boundary::Boundary;
pub use error::GridError;
pub use grid::{Grid, MAX_DIMENSION};
pub use neighborhood::{MOORE, Neighborhood, Offset, VON_NEUMANN};
