//! Color mapping and pixel rendering for the Tessera simulation engine.
//!
//! The renderer only ever reads a grid. It writes RGBA bytes into any
//! [`Surface`] (row-major, top to bottom, `width * height * 4` bytes).
//!
//! # Modules
//!
//! - [`color`] -- [`Rgb`], serializable [`ColorScheme`]s, total [`ColorMapper`].
//! - [`presets`] -- Built-in schemes for each rule family.
//! - [`surface`] -- The [`Surface`] trait and [`RgbaSurface`].
//! - [`renderer`] -- Block and sampled rendering, incremental redraw, fades.
//! - [`error`] -- [`RenderError`].

pub mod color;
pub mod error;
pub mod presets;
pub mod renderer;
pub mod surface;

pub use color::{Band, CellShade, ColorMapper, ColorScheme, GradientStop, Rgb};
pub use error::RenderError;
pub use renderer::{RenderMode, RenderSettings, Renderer};
pub use surface::{RgbaSurface, Surface};
