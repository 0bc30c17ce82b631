//! Pixel surfaces: `width x height x 4` RGBA bytes, row-major, top to
//! bottom.

use crate::color::Rgb;
use crate::error::RenderError;

/// A writable RGBA pixel buffer.
///
/// Implementations must keep `pixels().len() == width() * height() * 4`;
/// the renderer checks this before every write and reports a mismatch as
/// [`RenderError::SurfaceSize`].
pub trait Surface {
    /// Width in pixels.
    fn width(&self) -> usize;

    /// Height in pixels.
    fn height(&self) -> usize;

    /// The RGBA bytes.
    fn pixels(&self) -> &[u8];

    /// Mutable RGBA bytes.
    fn pixels_mut(&mut self) -> &mut [u8];
}

/// Required byte length for a surface, or an error if it does not match.
pub(crate) fn checked_len<S: Surface + ?Sized>(surface: &S) -> Result<usize, RenderError> {
    let expected = surface
        .width()
        .checked_mul(surface.height())
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| RenderError::invalid("surface dimensions overflow"))?;
    let found = surface.pixels().len();
    if found != expected {
        return Err(RenderError::SurfaceSize { expected, found });
    }
    Ok(expected)
}

/// An owned in-memory surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaSurface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbaSurface {
    /// Create a surface filled with opaque black.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] for a zero or overflowing
    /// size.
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .filter(|&n| n > 0)
            .ok_or_else(|| RenderError::invalid(format!("bad surface size {width}x{height}")))?;
        let mut surface = Self {
            width,
            height,
            pixels: vec![0; len],
        };
        surface.fill(Rgb::BLACK);
        Ok(surface)
    }

    /// Wrap an existing RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceSize`] if the length is not
    /// `width * height * 4`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, RenderError> {
        let surface = Self {
            width,
            height,
            pixels,
        };
        checked_len(&surface)?;
        Ok(surface)
    }

    /// Paint every pixel.
    pub fn fill(&mut self, color: Rgb) {
        let rgba = color.to_rgba();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// RGBA of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.width)?.checked_add(x)?.checked_mul(4)?;
        let bytes = self.pixels.get(start..start.checked_add(4)?)?;
        let mut out = [0; 4];
        out.copy_from_slice(bytes);
        Some(out)
    }

    /// Consume the surface, returning its bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

impl Surface for RgbaSurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}
