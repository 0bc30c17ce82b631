//! Grid-to-surface rendering.
//!
//! In [`RenderMode::Blocks`] each cell covers a `cell_scale x cell_scale`
//! block (minus an optional `cell_gap` on its top and left edges, painted in
//! the background color). In [`RenderMode::Sampled`] every pixel samples the
//! field at its own position, interpolating bilinearly between scalar
//! cells, which suits smooth fields such as diffusion.
//!
//! Incremental redraw ([`Renderer::render_cells`]) repaints only the given
//! cells. A block depends on one cell only, so after a full redraw of the
//! previous state, an incremental redraw of the changed cells yields the
//! same pixels as a full redraw of the new state. Sampled pixels depend on
//! up to four cells, so sampled mode always repaints everything.

use serde::{Deserialize, Serialize};
use tessera_grid::Grid;

use crate::color::{CellShade, ColorMapper, Rgb, mix};
use crate::error::RenderError;
use crate::presets::BACKGROUND;
use crate::surface::{Surface, checked_len};

/// How cells become pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Flat block per cell.
    #[default]
    Blocks,
    /// Per-pixel bilinear sampling of scalar values.
    Sampled,
}

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Pixels per cell along each axis.
    #[serde(default = "default_cell_scale")]
    pub cell_scale: usize,
    /// Background-colored pixels on the top and left of each block.
    #[serde(default)]
    pub cell_gap: usize,
    /// Block or sampled rendering.
    #[serde(default)]
    pub mode: RenderMode,
    /// Color for gaps, uncovered pixels, and fades.
    #[serde(default = "default_background")]
    pub background: Rgb,
}

const fn default_cell_scale() -> usize {
    4
}

const fn default_background() -> Rgb {
    BACKGROUND
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cell_scale: default_cell_scale(),
            cell_gap: 0,
            mode: RenderMode::default(),
            background: default_background(),
        }
    }
}

impl RenderSettings {
    /// Check `cell_scale >= 1` and `cell_gap < cell_scale`.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.cell_scale == 0 {
            return Err(RenderError::invalid("cell_scale must be at least 1"));
        }
        if self.cell_gap >= self.cell_scale {
            return Err(RenderError::invalid(format!(
                "cell_gap {} must be smaller than cell_scale {}",
                self.cell_gap, self.cell_scale
            )));
        }
        Ok(())
    }
}

/// Writes grids into surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    settings: RenderSettings,
}

impl Renderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] for invalid settings.
    pub fn new(settings: RenderSettings) -> Result<Self, RenderError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// The settings in effect.
    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Surface size that exactly fits a `width x height` grid.
    pub const fn surface_size(&self, width: usize, height: usize) -> (usize, usize) {
        (
            width.saturating_mul(self.settings.cell_scale),
            height.saturating_mul(self.settings.cell_scale),
        )
    }

    /// Repaint the whole surface from `grid`.
    ///
    /// `project` turns a cell value into the shade the mapper colors.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceSize`] if the surface buffer is not
    /// `width * height * 4` bytes.
    pub fn render_full<T, S, F>(
        &self,
        grid: &Grid<T>,
        mapper: &ColorMapper,
        project: F,
        surface: &mut S,
    ) -> Result<(), RenderError>
    where
        T: Copy,
        S: Surface + ?Sized,
        F: Fn(T) -> CellShade,
    {
        checked_len(surface)?;
        fill(surface, self.settings.background);
        match self.settings.mode {
            RenderMode::Blocks => {
                for (x, y, value) in grid.iter() {
                    self.draw_block(surface, x, y, mapper.color_for(project(value)));
                }
            }
            RenderMode::Sampled => self.draw_sampled(grid, mapper, &project, surface),
        }
        Ok(())
    }

    /// Repaint only the cells at the given linear indices.
    ///
    /// The surface must hold a previous full render of the same grid
    /// geometry. Sampled mode repaints everything.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceSize`] for a wrongly sized surface.
    pub fn render_cells<T, S, F>(
        &self,
        grid: &Grid<T>,
        mapper: &ColorMapper,
        project: F,
        cells: &[usize],
        surface: &mut S,
    ) -> Result<(), RenderError>
    where
        T: Copy,
        S: Surface + ?Sized,
        F: Fn(T) -> CellShade,
    {
        if self.settings.mode == RenderMode::Sampled {
            return self.render_full(grid, mapper, project, surface);
        }
        checked_len(surface)?;
        for &index in cells {
            let (Some((x, y)), Some(value)) = (grid.coords(index), grid.get_index(index)) else {
                continue;
            };
            self.draw_block(surface, x, y, mapper.color_for(project(value)));
        }
        Ok(())
    }

    /// Blend `base` toward the background by `t` in `[0, 1]` and write the
    /// result into `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceSize`] if `base` and the surface differ
    /// in length or the surface is wrongly sized.
    pub fn fade<S: Surface + ?Sized>(&self, base: &[u8], t: f32, surface: &mut S) -> Result<(), RenderError> {
        let expected = checked_len(surface)?;
        if base.len() != expected {
            return Err(RenderError::SurfaceSize {
                expected,
                found: base.len(),
            });
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let bg = self.settings.background.to_rgba();
        for (out, from) in surface.pixels_mut().chunks_exact_mut(4).zip(base.chunks_exact(4)) {
            for ((o, &f), &b) in out.iter_mut().zip(from).zip(&bg) {
                *o = mix(f, b, t);
            }
        }
        Ok(())
    }

    fn draw_block<S: Surface + ?Sized>(&self, surface: &mut S, x: usize, y: usize, color: Rgb) {
        let scale = self.settings.cell_scale;
        let gap = self.settings.cell_gap;
        let (sw, sh) = (surface.width(), surface.height());
        let fg = color.to_rgba();
        let bg = self.settings.background.to_rgba();
        let (Some(x0), Some(y0)) = (x.checked_mul(scale), y.checked_mul(scale)) else {
            return;
        };
        for dy in 0..scale {
            let Some(py) = y0.checked_add(dy).filter(|&py| py < sh) else {
                break;
            };
            for dx in 0..scale {
                let Some(px) = x0.checked_add(dx).filter(|&px| px < sw) else {
                    break;
                };
                let rgba = if dx < gap || dy < gap { bg } else { fg };
                put(surface, px, py, rgba);
            }
        }
    }

    fn draw_sampled<T, S, F>(&self, grid: &Grid<T>, mapper: &ColorMapper, project: &F, surface: &mut S)
    where
        T: Copy,
        S: Surface + ?Sized,
        F: Fn(T) -> CellShade,
    {
        let (covered_w, covered_h) = self.surface_size(grid.width(), grid.height());
        let width = surface.width().min(covered_w);
        let height = surface.height().min(covered_h);
        let scale = to_f32(self.settings.cell_scale);
        let shade_at = |x: usize, y: usize| grid.get(x, y).map(project);

        for py in 0..height {
            let v = (to_f32(py) + 0.5) / scale - 0.5;
            let (y0, y1, fy) = axis(v, grid.height());
            for px in 0..width {
                let u = (to_f32(px) + 0.5) / scale - 0.5;
                let (x0, x1, fx) = axis(u, grid.width());
                let corners = [shade_at(x0, y0), shade_at(x1, y0), shade_at(x0, y1), shade_at(x1, y1)];
                let shade = match corners {
                    [
                        Some(CellShade::Scalar(a)),
                        Some(CellShade::Scalar(b)),
                        Some(CellShade::Scalar(c)),
                        Some(CellShade::Scalar(d)),
                    ] => {
                        let top = (b - a).mul_add(fx, a);
                        let bottom = (d - c).mul_add(fx, c);
                        CellShade::Scalar((bottom - top).mul_add(fy, top))
                    }
                    // Discrete shades are not interpolated: nearest cell.
                    _ => {
                        let nx = if fx < 0.5 { x0 } else { x1 };
                        let ny = if fy < 0.5 { y0 } else { y1 };
                        shade_at(nx, ny).unwrap_or(CellShade::Index(0))
                    }
                };
                put(surface, px, py, mapper.color_for(shade).to_rgba());
            }
        }
    }
}

/// Lower cell, upper cell, and fraction between them for a continuous
/// coordinate, clamped to `[0, len - 1]`.
fn axis(coord: f32, len: usize) -> (usize, usize, f32) {
    let last = len.saturating_sub(1);
    if coord.is_nan() || coord <= 0.0 {
        return (0, 1.min(last), 0.0);
    }
    let floor = coord.floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = (floor.min(to_f32(last)) as usize).min(last);
    let upper = lower.saturating_add(1).min(last);
    let frac = if lower == last { 0.0 } else { (coord - floor).clamp(0.0, 1.0) };
    (lower, upper, frac)
}

#[allow(clippy::cast_precision_loss)]
const fn to_f32(n: usize) -> f32 {
    n as f32
}

fn fill<S: Surface + ?Sized>(surface: &mut S, color: Rgb) {
    let rgba = color.to_rgba();
    for px in surface.pixels_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn put<S: Surface + ?Sized>(surface: &mut S, x: usize, y: usize, rgba: [u8; 4]) {
    let width = surface.width();
    let Some(start) = y
        .checked_mul(width)
        .and_then(|row| row.checked_add(x))
        .and_then(|i| i.checked_mul(4))
    else {
        return;
    };
    let Some(end) = start.checked_add(4) else {
        return;
    };
    if let Some(px) = surface.pixels_mut().get_mut(start..end) {
        px.copy_from_slice(&rgba);
    }
}
