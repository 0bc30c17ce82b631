//! Colors and cell-value-to-color mapping.
//!
//! A [`ColorScheme`] is the serializable description (what a config file
//! holds); [`ColorScheme::build`] validates it once and yields a
//! [`ColorMapper`], which is total: every [`CellShade`], including NaN and
//! out-of-range values, maps to some color.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// An opaque 8-bit RGB color, serialized as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a color from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidColor`] for anything else.
    pub fn parse(value: &str) -> Result<Self, RenderError> {
        let invalid = || RenderError::InvalidColor {
            value: value.to_owned(),
        };
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().ok_or_else(invalid);
        match hex.len() {
            6 => Ok(Self::new(
                channel(hex.get(0..2).ok_or_else(invalid)?)?,
                channel(hex.get(2..4).ok_or_else(invalid)?)?,
                channel(hex.get(4..6).ok_or_else(invalid)?)?,
            )),
            3 => {
                let short = |s: &str| channel(s).map(|v| v.saturating_mul(17));
                Ok(Self::new(
                    short(hex.get(0..1).ok_or_else(invalid)?)?,
                    short(hex.get(1..2).ok_or_else(invalid)?)?,
                    short(hex.get(2..3).ok_or_else(invalid)?)?,
                ))
            }
            _ => Err(invalid()),
        }
    }

    /// Linear blend toward `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Self::new(
            mix(self.r, other.r, t),
            mix(self.g, other.g, t),
            mix(self.b, other.b, t),
        )
    }

    /// RGBA bytes with full opacity.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Blend one channel, rounding to the nearest byte.
pub(crate) fn mix(a: u8, b: u8, t: f32) -> u8 {
    let (a, b) = (f32::from(a), f32::from(b));
    let value = (b - a).mul_add(t, a).round().clamp(0.0, 255.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = value as u8;
    byte
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

// ---------------------------------------------------------------------------
// Schemes
// ---------------------------------------------------------------------------

/// A gradient control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position in `[0, 1]` of the normalized value.
    pub at: f32,
    /// Color at this position.
    pub color: Rgb,
}

impl GradientStop {
    /// Create a stop.
    pub const fn new(at: f32, color: Rgb) -> Self {
        Self { at, color }
    }
}

/// A flat color used for values strictly below `below`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Exclusive upper threshold.
    pub below: f32,
    /// Color of the band.
    pub color: Rgb,
}

/// Serializable description of a color mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorScheme {
    /// One color per integer state; larger states use the last color.
    Palette {
        /// Color for state `i` at position `i`.
        colors: Vec<Rgb>,
    },
    /// Smooth interpolation between stops over `[min, max]`.
    Gradient {
        /// Stops with non-decreasing `at`.
        stops: Vec<GradientStop>,
        /// Value mapped to position 0.
        #[serde(default)]
        min: f32,
        /// Value mapped to position 1.
        #[serde(default = "default_max")]
        max: f32,
    },
    /// Flat colors between thresholds.
    Bands {
        /// Bands with strictly increasing thresholds.
        bands: Vec<Band>,
        /// Color for values at or above the last threshold.
        above: Rgb,
    },
    /// A gradient sampled once into `size` entries.
    Table {
        /// Stops with non-decreasing `at`.
        stops: Vec<GradientStop>,
        /// Value mapped to the first entry.
        #[serde(default)]
        min: f32,
        /// Value mapped to the last entry.
        #[serde(default = "default_max")]
        max: f32,
        /// Number of entries.
        size: usize,
    },
}

const fn default_max() -> f32 {
    1.0
}

impl ColorScheme {
    /// Validate and build the mapper.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] for an empty palette, stop
    /// list or band list, unordered or non-finite stops and thresholds, an
    /// empty range (`min >= max`), or a table with fewer than 2 entries.
    pub fn build(&self) -> Result<ColorMapper, RenderError> {
        match self {
            Self::Palette { colors } => ColorMapper::palette(colors.clone()),
            Self::Gradient { stops, min, max } => ColorMapper::gradient(stops.clone(), *min, *max),
            Self::Bands { bands, above } => ColorMapper::bands(bands.clone(), *above),
            Self::Table {
                stops,
                min,
                max,
                size,
            } => ColorMapper::table(stops, *min, *max, *size),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapper
// ---------------------------------------------------------------------------

/// The value a renderer asks a mapper to color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellShade {
    /// A discrete state tag.
    Index(u32),
    /// A continuous value.
    Scalar(f32),
}

impl CellShade {
    /// The shade as a float (NaN stays NaN).
    #[allow(clippy::cast_precision_loss)]
    pub fn value(self) -> f32 {
        match self {
            Self::Index(i) => i as f32,
            Self::Scalar(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Palette(Vec<Rgb>),
    Gradient {
        stops: Vec<GradientStop>,
        min: f32,
        max: f32,
    },
    Bands {
        bands: Vec<Band>,
        above: Rgb,
    },
    Table {
        colors: Vec<Rgb>,
        min: f32,
        max: f32,
    },
}

/// A validated, total mapping from [`CellShade`] to [`Rgb`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapper {
    mode: Mode,
}

impl ColorMapper {
    /// Map state `i` to `colors[i]`.
    pub fn palette(colors: Vec<Rgb>) -> Result<Self, RenderError> {
        if colors.is_empty() {
            return Err(RenderError::invalid("palette needs at least one color"));
        }
        Ok(Self {
            mode: Mode::Palette(colors),
        })
    }

    /// Interpolate between `stops` over `[min, max]`.
    pub fn gradient(stops: Vec<GradientStop>, min: f32, max: f32) -> Result<Self, RenderError> {
        check_stops(&stops)?;
        check_range(min, max)?;
        Ok(Self {
            mode: Mode::Gradient { stops, min, max },
        })
    }

    /// Flat bands below each threshold, `above` past the last one.
    pub fn bands(bands: Vec<Band>, above: Rgb) -> Result<Self, RenderError> {
        if bands.is_empty() {
            return Err(RenderError::invalid("band map needs at least one band"));
        }
        if bands.iter().any(|b| !b.below.is_finite()) {
            return Err(RenderError::invalid("band thresholds must be finite"));
        }
        if bands.windows(2).any(|w| matches!(w, [a, b] if a.below >= b.below)) {
            return Err(RenderError::invalid("band thresholds must strictly increase"));
        }
        Ok(Self {
            mode: Mode::Bands { bands, above },
        })
    }

    /// Precompute `size` samples of a gradient over `[min, max]`.
    pub fn table(stops: &[GradientStop], min: f32, max: f32, size: usize) -> Result<Self, RenderError> {
        check_stops(stops)?;
        check_range(min, max)?;
        if size < 2 {
            return Err(RenderError::invalid(format!(
                "color table needs at least 2 entries, got {size}"
            )));
        }
        let last = size.saturating_sub(1);
        let colors = (0..size).map(|i| sample(stops, ratio(i, last))).collect();
        Ok(Self {
            mode: Mode::Table { colors, min, max },
        })
    }

    /// The color for a shade. Never fails.
    pub fn color_for(&self, shade: CellShade) -> Rgb {
        match &self.mode {
            Mode::Palette(colors) => {
                let index = match shade {
                    CellShade::Index(i) => usize::try_from(i).unwrap_or(usize::MAX),
                    CellShade::Scalar(v) => float_index(v),
                };
                let last = colors.len().saturating_sub(1);
                colors.get(index.min(last)).copied().unwrap_or(Rgb::BLACK)
            }
            Mode::Gradient { stops, min, max } => sample(stops, normalize(shade.value(), *min, *max)),
            Mode::Bands { bands, above } => {
                let v = shade.value();
                if v.is_nan() {
                    return bands.first().map_or(*above, |b| b.color);
                }
                bands.iter().find(|b| v < b.below).map_or(*above, |b| b.color)
            }
            Mode::Table { colors, min, max } => {
                let t = normalize(shade.value(), *min, *max);
                let last = colors.len().saturating_sub(1);
                let index = float_index(t * ratio_f32(last));
                colors.get(index.min(last)).copied().unwrap_or(Rgb::BLACK)
            }
        }
    }
}

fn check_stops(stops: &[GradientStop]) -> Result<(), RenderError> {
    if stops.is_empty() {
        return Err(RenderError::invalid("gradient needs at least one stop"));
    }
    if stops.iter().any(|s| !s.at.is_finite() || !(0.0..=1.0).contains(&s.at)) {
        return Err(RenderError::invalid("gradient stops must lie in [0, 1]"));
    }
    if stops.windows(2).any(|w| matches!(w, [a, b] if a.at > b.at)) {
        return Err(RenderError::invalid("gradient stops must be in ascending order"));
    }
    Ok(())
}

fn check_range(min: f32, max: f32) -> Result<(), RenderError> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(RenderError::invalid(format!(
            "color range [{min}, {max}] is empty or not finite"
        )));
    }
    Ok(())
}

/// `(v - min) / (max - min)` clamped to `[0, 1]`; NaN maps to 0.
fn normalize(v: f32, min: f32, max: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    ((v - min) / (max - min)).clamp(0.0, 1.0)
}

/// Interpolate along sorted stops at position `t`.
fn sample(stops: &[GradientStop], t: f32) -> Rgb {
    let Some(first) = stops.first() else {
        return Rgb::BLACK;
    };
    if t <= first.at {
        return first.color;
    }
    for pair in stops.windows(2) {
        if let [a, b] = pair {
            if t <= b.at {
                let span = b.at - a.at;
                if span <= f32::EPSILON {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.at) / span);
            }
        }
    }
    stops.last().map_or(first.color, |s| s.color)
}

/// Non-negative float to an index, rounding to nearest; NaN and negatives
/// give 0.
fn float_index(v: f32) -> usize {
    if v.is_nan() || v <= 0.0 {
        return 0;
    }
    let rounded = v.round().min(f32::from(u16::MAX));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = rounded as usize;
    index
}

#[allow(clippy::cast_precision_loss)]
fn ratio_f32(n: usize) -> f32 {
    n as f32
}

fn ratio(i: usize, last: usize) -> f32 {
    if last == 0 { 0.0 } else { ratio_f32(i) / ratio_f32(last) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Rgb::parse("#c8922a").unwrap(), Rgb::new(200, 146, 42));
        assert_eq!(Rgb::parse("#555").unwrap(), Rgb::new(0x55, 0x55, 0x55));
        assert!(Rgb::parse("c8922a").is_err());
        assert!(Rgb::parse("#c8922").is_err());
        assert!(Rgb::parse("#zzzzzz").is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb::new(15, 15, 15)).unwrap();
        assert_eq!(json, "\"#0f0f0f\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(15, 15, 15));
    }

    #[test]
    fn palette_clamps_large_states() {
        let mapper = ColorMapper::palette(vec![Rgb::BLACK, Rgb::WHITE]).unwrap();
        assert_eq!(mapper.color_for(CellShade::Index(0)), Rgb::BLACK);
        assert_eq!(mapper.color_for(CellShade::Index(7)), Rgb::WHITE);
        assert_eq!(mapper.color_for(CellShade::Scalar(f32::NAN)), Rgb::BLACK);
    }

    #[test]
    fn gradient_interpolates_and_clamps() {
        let stops = vec![
            GradientStop::new(0.0, Rgb::BLACK),
            GradientStop::new(1.0, Rgb::new(200, 100, 0)),
        ];
        let mapper = ColorMapper::gradient(stops, 0.0, 2.0).unwrap();
        assert_eq!(mapper.color_for(CellShade::Scalar(1.0)), Rgb::new(100, 50, 0));
        assert_eq!(mapper.color_for(CellShade::Scalar(-5.0)), Rgb::BLACK);
        assert_eq!(mapper.color_for(CellShade::Scalar(9.0)), Rgb::new(200, 100, 0));
        assert_eq!(mapper.color_for(CellShade::Scalar(f32::NAN)), Rgb::BLACK);
    }

    #[test]
    fn bands_are_flat() {
        let bands = vec![
            Band {
                below: 0.5,
                color: Rgb::BLACK,
            },
            Band {
                below: 0.8,
                color: Rgb::new(1, 2, 3),
            },
        ];
        let mapper = ColorMapper::bands(bands, Rgb::WHITE).unwrap();
        assert_eq!(mapper.color_for(CellShade::Scalar(0.1)), Rgb::BLACK);
        assert_eq!(mapper.color_for(CellShade::Scalar(0.49)), Rgb::BLACK);
        assert_eq!(mapper.color_for(CellShade::Scalar(0.5)), Rgb::new(1, 2, 3));
        assert_eq!(mapper.color_for(CellShade::Scalar(0.8)), Rgb::WHITE);
    }

    #[test]
    fn table_matches_gradient_at_entries() {
        let stops = [
            GradientStop::new(0.0, Rgb::BLACK),
            GradientStop::new(1.0, Rgb::WHITE),
        ];
        let table = ColorMapper::table(&stops, 0.0, 4.0, 5).unwrap();
        let gradient = ColorMapper::gradient(stops.to_vec(), 0.0, 4.0).unwrap();
        for i in 0..5 {
            assert_eq!(
                table.color_for(CellShade::Index(i)),
                gradient.color_for(CellShade::Index(i))
            );
        }
    }

    #[test]
    fn invalid_schemes_are_rejected() {
        assert!(ColorMapper::palette(vec![]).is_err());
        assert!(ColorMapper::gradient(vec![], 0.0, 1.0).is_err());
        let stops = vec![
            GradientStop::new(0.6, Rgb::BLACK),
            GradientStop::new(0.2, Rgb::WHITE),
        ];
        assert!(ColorMapper::gradient(stops, 0.0, 1.0).is_err());
        let one = vec![GradientStop::new(0.0, Rgb::BLACK)];
        assert!(ColorMapper::gradient(one.clone(), 1.0, 1.0).is_err());
        assert!(ColorMapper::table(&one, 0.0, 1.0, 1).is_err());
    }

    #[test]
    fn scheme_builds_from_yaml() {
        let yaml = "kind: gradient\nstops:\n  - { at: 0.0, color: '#000000' }\n  - { at: 1.0, color: '#ffffff' }\nmax: 10.0\n";
        let scheme: ColorScheme = serde_yml::from_str(yaml).unwrap();
        let mapper = scheme.build().unwrap();
        assert_eq!(mapper.color_for(CellShade::Scalar(10.0)), Rgb::WHITE);
    }
}
