//! Initial population strategies.
//!
//! Seeding always starts from a cleared grid and draws any randomness from
//! the executor's seeded source, so a given seed reproduces the same
//! starting state. `auto` picks the strategy each rule family is usually
//! shown with.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tessera_grid::Grid;
use tessera_rules::gray_scott::Chemicals;
use tessera_rules::percolation::{BLOCKED, CRITICAL_PROBABILITY, OPEN};
use tessera_rules::{DiscreteRule, Lattice};

use crate::config::{ConfigError, RuleConfig};
use crate::error::SimulationError;
use crate::patterns::{self, Anchor, PatternCell};

/// Initial population, tagged by `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedingConfig {
    /// The rule family's usual starting state.
    #[default]
    Auto,
    /// Every cell in the background state.
    Empty,
    /// Each cell is live with probability `density`, taking a uniform
    /// state in `1..states`.
    Random {
        /// Fraction of live cells.
        #[serde(default = "default_density")]
        density: f64,
        /// Number of states, including the background state 0.
        #[serde(default = "default_states")]
        states: u8,
    },
    /// Every cell set to `value`.
    Fill {
        /// Cell value.
        value: f64,
    },
    /// Stamp a named pattern or an explicit cell list.
    Pattern {
        /// Built-in pattern name.
        #[serde(default)]
        name: Option<String>,
        /// Explicit `(x, y)` offsets, used when `name` is absent.
        #[serde(default)]
        cells: Option<Vec<(i32, i32)>>,
        /// State written for explicit cells.
        #[serde(default = "default_value")]
        value: u8,
        /// Placement.
        #[serde(default)]
        anchor: Anchor,
    },
    /// A single cell: bottom-center for elementary rules, grid center
    /// otherwise.
    Center {
        /// Cell value.
        #[serde(default = "default_value")]
        value: u8,
    },
    /// Gaussian heat sources.
    Spot {
        /// The sources.
        #[serde(default)]
        spots: Vec<HeatSpot>,
    },
    /// A jittered activator patch at the center of a resting field.
    ChemicalPatch {
        /// Patch radius as a fraction of the shorter grid side.
        #[serde(default = "default_radius_fraction")]
        radius_fraction: f32,
        /// Amplitude of the uniform jitter added to `U` and `V`.
        #[serde(default = "default_jitter")]
        jitter: f32,
    },
    /// Each site open with probability `probability`.
    Percolation {
        /// Site-open probability.
        #[serde(default = "default_probability")]
        probability: f64,
    },
}

/// One Gaussian heat source, in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSpot {
    /// Center column.
    pub x: f32,
    /// Center row.
    pub y: f32,
    /// Cutoff radius.
    pub radius: f32,
    /// Peak value.
    pub intensity: f32,
}

const fn default_density() -> f64 {
    0.3
}

const fn default_states() -> u8 {
    2
}

const fn default_value() -> u8 {
    1
}

const fn default_radius_fraction() -> f32 {
    0.06
}

const fn default_jitter() -> f32 {
    0.05
}

const fn default_probability() -> f64 {
    CRITICAL_PROBABILITY
}

/// Resting-patch chemical concentrations before jitter.
const PATCH: Chemicals = Chemicals::new(0.5, 0.25);

impl SeedingConfig {
    /// Replace `Auto` with the concrete strategy for `rule`.
    pub fn resolved(&self, rule: &RuleConfig) -> Self {
        if *self != Self::Auto {
            return self.clone();
        }
        match rule {
            RuleConfig::LifeLike { .. } => Self::Random {
                density: default_density(),
                states: 2,
            },
            RuleConfig::Wireworld => Self::Pattern {
                name: Some("wireworld_loop".to_owned()),
                cells: None,
                value: default_value(),
                anchor: Anchor::Center,
            },
            RuleConfig::BriansBrain => Self::Random {
                density: default_density(),
                states: 3,
            },
            RuleConfig::Cyclic { states, .. } => Self::Random {
                density: 0.08,
                states: *states,
            },
            RuleConfig::Elementary { .. } => Self::Center { value: 1 },
            RuleConfig::Ising { .. } => Self::Random {
                density: 0.5,
                states: 2,
            },
            RuleConfig::Diffusion { .. } => Self::Spot { spots: Vec::new() },
            RuleConfig::GrayScott { .. } => Self::ChemicalPatch {
                radius_fraction: default_radius_fraction(),
                jitter: default_jitter(),
            },
            RuleConfig::Sandpile { .. } => Self::Empty,
            RuleConfig::Percolation => Self::Percolation {
                probability: default_probability(),
            },
        }
    }

    /// Check that this strategy can populate a lattice built for `rule`.
    pub fn validate(&self, rule: &RuleConfig) -> Result<(), ConfigError> {
        let seeding = self.resolved(rule);
        let states = rule.states();
        let contradiction = || {
            ConfigError::invalid(format!(
                "{} seeding cannot populate a {} rule",
                seeding.kind(),
                rule.kind()
            ))
        };
        match &seeding {
            Self::Auto | Self::Empty => Ok(()),
            Self::Random { density, states: n } => {
                check_unit("seeding.density", *density)?;
                let limit = match rule {
                    RuleConfig::Sandpile { .. } => Some(u16::MAX),
                    _ => states,
                };
                let limit = limit.ok_or_else(contradiction)?;
                if *n < 2 || u16::from(*n) > limit {
                    return Err(ConfigError::invalid(format!(
                        "seeding.states must be between 2 and {limit} for a {} rule",
                        rule.kind()
                    )));
                }
                Ok(())
            }
            Self::Fill { value } => match (rule, states) {
                (RuleConfig::Diffusion { .. }, _) => check_unit("seeding.value", *value),
                (RuleConfig::Sandpile { .. }, _) => check_count(*value, f64::from(u32::MAX)),
                (_, Some(n)) => check_count(*value, f64::from(n.saturating_sub(1))),
                (_, None) => Err(contradiction()),
            },
            Self::Pattern {
                name, cells, value, ..
            } => {
                let n = states.ok_or_else(contradiction)?;
                if u16::from(*value) >= n {
                    return Err(ConfigError::invalid(format!(
                        "pattern value {value} exceeds the rule's {n} states"
                    )));
                }
                match (name, cells) {
                    (Some(name), _) if patterns::named(name).is_none() => Err(ConfigError::invalid(format!(
                        "unknown pattern {name:?}, expected one of {:?}",
                        patterns::NAMES
                    ))),
                    (None, None) => Err(ConfigError::invalid("pattern seeding needs a name or cells")),
                    _ => Ok(()),
                }
            }
            Self::Center { value } => match (rule, states) {
                (RuleConfig::Sandpile { .. }, _) => Ok(()),
                (_, Some(n)) if u16::from(*value) < n => Ok(()),
                (_, Some(n)) => Err(ConfigError::invalid(format!(
                    "center value {value} exceeds the rule's {n} states"
                ))),
                (_, None) => Err(contradiction()),
            },
            Self::Spot { spots } => {
                if !matches!(rule, RuleConfig::Diffusion { .. }) {
                    return Err(contradiction());
                }
                for spot in spots {
                    if !(spot.radius.is_finite() && spot.radius > 0.0) || !spot.intensity.is_finite() {
                        return Err(ConfigError::invalid("heat spots need a positive radius"));
                    }
                }
                Ok(())
            }
            Self::ChemicalPatch {
                radius_fraction,
                jitter,
            } => {
                if !matches!(rule, RuleConfig::GrayScott { .. }) {
                    return Err(contradiction());
                }
                if !(*radius_fraction > 0.0 && *radius_fraction <= 0.5) {
                    return Err(ConfigError::invalid("radius_fraction must be in (0, 0.5]"));
                }
                if !(*jitter >= 0.0 && *jitter <= 0.25) {
                    return Err(ConfigError::invalid("jitter must be in [0, 0.25]"));
                }
                Ok(())
            }
            Self::Percolation { probability } => {
                if !matches!(rule, RuleConfig::Percolation) {
                    return Err(contradiction());
                }
                check_unit("seeding.probability", *probability)
            }
        }
    }

    /// The `kind` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Empty => "empty",
            Self::Random { .. } => "random",
            Self::Fill { .. } => "fill",
            Self::Pattern { .. } => "pattern",
            Self::Center { .. } => "center",
            Self::Spot { .. } => "spot",
            Self::ChemicalPatch { .. } => "chemical_patch",
            Self::Percolation { .. } => "percolation",
        }
    }

    /// Clear `lattice` and populate it for `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if the strategy does not
    /// fit the lattice. [`SeedingConfig::validate`] rules this out for
    /// configurations that passed validation.
    pub fn apply(&self, rule: &RuleConfig, lattice: &mut Lattice, rng: &mut SmallRng) -> Result<(), SimulationError> {
        let seeding = self.resolved(rule);
        let mismatch = || {
            SimulationError::invalid(format!(
                "{} seeding does not fit a {} lattice",
                seeding.kind(),
                rule.kind()
            ))
        };
        match lattice {
            Lattice::Discrete { buffers, rule: active } => {
                let elementary = matches!(active, DiscreteRule::Elementary(_));
                let grid = buffers.current_mut();
                grid.fill(0);
                seed_states(&seeding, grid, rng, elementary).ok_or_else(mismatch)?;
            }
            Lattice::Pile { grid, .. } => {
                grid.fill(0);
                seed_grains(&seeding, grid, rng).ok_or_else(mismatch)?;
            }
            Lattice::Scalar { buffers, .. } => {
                let grid = buffers.current_mut();
                grid.fill(0.0);
                seed_heat(&seeding, grid)?.ok_or_else(mismatch)?;
            }
            Lattice::Chemical { buffers, .. } => {
                let grid = buffers.current_mut();
                grid.fill(Chemicals::RESTING);
                seed_chemicals(&seeding, grid, rng).ok_or_else(mismatch)?;
            }
            Lattice::Percolation { grid, .. } => {
                grid.fill(BLOCKED);
                match seeding {
                    Self::Empty => {}
                    Self::Percolation { probability } => {
                        for cell in grid.cells_mut() {
                            if rng.random::<f64>() < probability {
                                *cell = OPEN;
                            }
                        }
                    }
                    _ => return Err(mismatch()),
                }
            }
        }
        lattice.reset_progress();
        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!("{field} must be in [0, 1], got {value}")))
    }
}

fn check_count(value: f64, max: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value <= max && value.fract().abs() < f64::EPSILON {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!(
            "seeding.value must be a whole number in [0, {max}], got {value}"
        )))
    }
}

/// Populate a small-state grid. `None` if the strategy does not apply.
fn seed_states(seeding: &SeedingConfig, grid: &mut Grid<u8>, rng: &mut SmallRng, elementary: bool) -> Option<()> {
    match seeding {
        SeedingConfig::Auto | SeedingConfig::Empty => {}
        SeedingConfig::Random { density, states } => {
            if *states < 2 {
                return None;
            }
            for cell in grid.cells_mut() {
                if rng.random::<f64>() < *density {
                    *cell = rng.random_range(1..*states);
                }
            }
        }
        SeedingConfig::Fill { value } => grid.fill(whole::<u8>(*value)?),
        SeedingConfig::Pattern {
            name,
            cells,
            value,
            anchor,
        } => {
            let stamp: Vec<PatternCell> = match (name, cells) {
                (Some(name), _) => patterns::named(name)?,
                (None, Some(cells)) => cells.iter().map(|&(x, y)| (x, y, *value)).collect(),
                (None, None) => return None,
            };
            patterns::stamp(grid, &stamp, *anchor);
        }
        SeedingConfig::Center { value } => {
            let x = grid.width() / 2;
            let y = if elementary {
                grid.height().saturating_sub(1)
            } else {
                grid.height() / 2
            };
            grid.set(x, y, *value).ok()?;
        }
        SeedingConfig::Spot { .. } | SeedingConfig::ChemicalPatch { .. } | SeedingConfig::Percolation { .. } => {
            return None;
        }
    }
    Some(())
}

fn seed_grains(seeding: &SeedingConfig, grid: &mut Grid<u32>, rng: &mut SmallRng) -> Option<()> {
    match seeding {
        SeedingConfig::Auto | SeedingConfig::Empty => {}
        SeedingConfig::Random { density, states } => {
            if *states < 2 {
                return None;
            }
            let top = u32::from(*states);
            for cell in grid.cells_mut() {
                if rng.random::<f64>() < *density {
                    *cell = rng.random_range(1..top);
                }
            }
        }
        SeedingConfig::Fill { value } => grid.fill(whole::<u32>(*value)?),
        SeedingConfig::Center { value } => {
            let (x, y) = (grid.width() / 2, grid.height() / 2);
            grid.set(x, y, u32::from(*value)).ok()?;
        }
        SeedingConfig::Pattern { .. }
        | SeedingConfig::Spot { .. }
        | SeedingConfig::ChemicalPatch { .. }
        | SeedingConfig::Percolation { .. } => return None,
    }
    Some(())
}

/// `Ok(None)` means the strategy does not apply to a heat lattice.
fn seed_heat(seeding: &SeedingConfig, grid: &mut Grid<f32>) -> Result<Option<()>, SimulationError> {
    match seeding {
        SeedingConfig::Auto | SeedingConfig::Empty => {}
        SeedingConfig::Fill { value } => grid.fill(narrow(*value)),
        SeedingConfig::Spot { spots } if spots.is_empty() => {
            for spot in default_spots(grid.width(), grid.height()) {
                add_spot(grid, spot)?;
            }
        }
        SeedingConfig::Spot { spots } => {
            for &spot in spots {
                add_spot(grid, spot)?;
            }
        }
        _ => return Ok(None),
    }
    Ok(Some(()))
}

/// One large central source and two smaller ones on the diagonal.
#[allow(clippy::cast_precision_loss)]
fn default_spots(width: usize, height: usize) -> [HeatSpot; 3] {
    let (w, h) = (width as f32, height as f32);
    let r = w.min(h);
    [
        HeatSpot {
            x: w * 0.5,
            y: h * 0.5,
            radius: r * 0.2,
            intensity: 1.0,
        },
        HeatSpot {
            x: w * 0.25,
            y: h * 0.3,
            radius: r * 0.12,
            intensity: 0.8,
        },
        HeatSpot {
            x: w * 0.75,
            y: h * 0.7,
            radius: r * 0.12,
            intensity: 0.8,
        },
    ]
}

#[allow(clippy::cast_possible_truncation)]
const fn narrow(value: f64) -> f32 {
    value as f32
}

/// Raise cells within `radius` to a Gaussian profile (`sigma = radius / 2.5`),
/// keeping any hotter value already there.
#[allow(clippy::cast_precision_loss)]
fn add_spot(grid: &mut Grid<f32>, spot: HeatSpot) -> Result<(), SimulationError> {
    let sigma = spot.radius / 2.5;
    let two_sigma_sq = 2.0 * sigma * sigma;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let d = (x as f32 - spot.x).hypot(y as f32 - spot.y);
            if d >= spot.radius {
                continue;
            }
            let v = spot.intensity * (-(d * d) / two_sigma_sq).exp();
            if let Some(old) = grid.get(x, y) {
                grid.set(x, y, old.max(v))?;
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn seed_chemicals(seeding: &SeedingConfig, grid: &mut Grid<Chemicals>, rng: &mut SmallRng) -> Option<()> {
    let (radius_fraction, jitter) = match seeding {
        SeedingConfig::Auto | SeedingConfig::Empty => return Some(()),
        SeedingConfig::ChemicalPatch {
            radius_fraction,
            jitter,
        } => (*radius_fraction, *jitter),
        _ => return None,
    };
    let (width, height) = (grid.width(), grid.height());
    let radius = (width.min(height) as f32 * radius_fraction).floor() as i64;
    let cx = i64::try_from(width / 2).unwrap_or(i64::MAX);
    let cy = i64::try_from(height / 2).unwrap_or(i64::MAX);
    let r_sq = radius.saturating_mul(radius);
    for dy in radius.saturating_neg()..=radius {
        for dx in radius.saturating_neg()..=radius {
            if dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)) > r_sq {
                continue;
            }
            let (Ok(x), Ok(y)) = (usize::try_from(cx.saturating_add(dx)), usize::try_from(cy.saturating_add(dy))) else {
                continue;
            };
            if x >= width || y >= height {
                continue;
            }
            let u = PATCH.u + (rng.random::<f32>() * 2.0 - 1.0) * jitter;
            let v = PATCH.v + (rng.random::<f32>() * 2.0 - 1.0) * jitter;
            grid.set(x, y, Chemicals::new(u, v)).ok()?;
        }
    }
    Some(())
}

/// A whole, in-range `f64` as an integer cell value.
fn whole<T: TryFrom<u64>>(value: f64) -> Option<T> {
    if value < 0.0 || value.fract().abs() > 0.0 || value > 1e15 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = value as u64;
    T::try_from(n).ok()
}
