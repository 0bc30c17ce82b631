//! Configuration loading and typed config structures for a Tessera
//! simulation.
//!
//! A simulation is described by `tessera-config.yaml` (or any YAML string).
//! The structs here mirror that file. Every field has a default, so an
//! empty document is a valid configuration: Conway's Life on a 100x70
//! torus, randomly seeded, stepping once per 16 ms frame.
//!
//! Loading never builds anything. [`SimulationConfig::validate`] performs
//! the cross-field checks; `SimulationHandle::create` calls it first and
//! refuses to construct a handle from a configuration that fails it.

use std::path::Path;

use serde::Deserialize;
use tessera_grid::{Boundary, MAX_DIMENSION, Neighborhood};
use tessera_render::{ColorScheme, RenderMode, RenderSettings, Rgb, presets};
use tessera_rules::ising::CRITICAL_TEMPERATURE;
use tessera_rules::life::CONWAY;
use tessera_rules::{DropSite, GrayScottPreset, Traversal};
use tracing::warn;

use crate::cadence::Cadence;
use crate::factory;
use crate::seeding::SeedingConfig;
use crate::stage::{AfterPause, StageConfig};

/// Environment variable overriding `simulation.seed`.
pub const SEED_ENV: &str = "TESSERA_SEED";
/// Environment variable overriding `logging.level`.
pub const LOG_ENV: &str = "TESSERA_LOG";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is out of range or contradictory.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `tessera-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Name, seed, and reproducibility settings.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Grid shape and boundary policy.
    #[serde(default)]
    pub grid: GridConfig,

    /// The update rule and its parameters.
    #[serde(default)]
    pub rule: RuleConfig,

    /// Initial population.
    #[serde(default)]
    pub seeding: SeedingConfig,

    /// Pixel output.
    #[serde(default)]
    pub render: RenderConfig,

    /// Frame pacing and batching.
    #[serde(default)]
    pub cadence: Cadence,

    /// Parameter sets cycled through in order. Empty means one implicit
    /// stage using the base configuration.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// When a stage ends and what happens next.
    #[serde(default)]
    pub termination: TerminationConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply `TESSERA_SEED` and `TESSERA_LOG` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(SEED_ENV) {
            match val.trim().parse::<u64>() {
                Ok(seed) => self.simulation.seed = Some(seed),
                Err(err) => warn!(value = %val, error = %err, "Ignoring unparseable TESSERA_SEED"),
            }
        }
        if let Ok(val) = std::env::var(LOG_ENV) {
            self.logging.level = val;
        }
    }

    /// Number of stages the scheduler cycles through (at least 1).
    pub fn stage_count(&self) -> usize {
        self.stages.len().max(1)
    }

    /// Every cross-field check. A configuration that passes can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.cadence.validate()?;
        self.render.validate()?;

        if self.simulation.determinism == Determinism::Strict && self.simulation.seed.is_none() {
            return Err(ConfigError::invalid(
                "simulation.determinism is strict but no seed was given",
            ));
        }

        factory::build_rule(&self.rule).map_err(|err| ConfigError::invalid(err.to_string()))?;
        if let RuleConfig::Sandpile { site, .. } = &self.rule {
            let (x, y) = site.resolve(self.grid.width, self.grid.height);
            if x >= self.grid.width || y >= self.grid.height {
                return Err(ConfigError::invalid(format!(
                    "sandpile drop site ({x}, {y}) is outside the grid"
                )));
            }
        }
        self.seeding.validate(&self.rule)?;

        for (index, stage) in self.stages.iter().enumerate() {
            let rule = stage
                .effective_rule(&self.rule)
                .map_err(|err| ConfigError::invalid(format!("stages[{index}]: {err}")))?;
            factory::build_rule(&rule)
                .map_err(|err| ConfigError::invalid(format!("stages[{index}]: {err}")))?;
            stage
                .effective_seeding(&self.seeding, &rule)
                .validate(&rule)
                .map_err(|err| ConfigError::invalid(format!("stages[{index}]: {err}")))?;
            stage
                .validate()
                .map_err(|err| ConfigError::invalid(format!("stages[{index}]: {err}")))?;
        }
        Ok(())
    }
}

/// Whether a missing seed is acceptable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determinism {
    /// A missing seed is drawn from the OS and logged.
    #[default]
    Relaxed,
    /// A missing seed is a configuration error.
    Strict,
}

/// Simulation-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Display name, used as the label of the implicit stage.
    #[serde(default = "default_name")]
    pub name: String,

    /// Seed for every random draw. `None` means draw one at create time.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Whether `seed` is mandatory.
    #[serde(default)]
    pub determinism: Determinism,

    /// Cell visiting order. Results do not depend on it.
    #[serde(default)]
    pub traversal: Traversal,
}

fn default_name() -> String {
    "tessera".to_owned()
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: None,
            determinism: Determinism::default(),
            traversal: Traversal::default(),
        }
    }
}

/// Grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Columns.
    #[serde(default = "default_width")]
    pub width: usize,

    /// Rows.
    #[serde(default = "default_height")]
    pub height: usize,

    /// Neighbor resolution at the edges.
    #[serde(default)]
    pub boundary: Boundary,
}

const fn default_width() -> usize {
    100
}

const fn default_height() -> usize {
    70
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            boundary: Boundary::default(),
        }
    }
}

impl GridConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let fits = |n: usize| (1..=MAX_DIMENSION).contains(&n);
        if !fits(self.width) || !fits(self.height) {
            return Err(ConfigError::invalid(format!(
                "grid must be between 1x1 and {MAX_DIMENSION}x{MAX_DIMENSION}, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// The update rule, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Totalistic `B../S..` rule.
    LifeLike {
        /// Birth/survival rulestring.
        #[serde(default = "default_rulestring")]
        rulestring: String,
    },
    /// Wireworld circuits.
    Wireworld,
    /// Brian's Brain.
    BriansBrain,
    /// Cyclic cellular automaton.
    Cyclic {
        /// Number of states.
        #[serde(default = "default_cyclic_states")]
        states: u8,
        /// Successor-state neighbors needed to advance.
        #[serde(default = "default_cyclic_threshold")]
        threshold: usize,
        /// Neighbor set.
        #[serde(default = "default_cyclic_neighborhood")]
        neighborhood: Neighborhood,
    },
    /// Elementary 1D rule shown as a scrolling history.
    Elementary {
        /// Wolfram rule number.
        #[serde(default = "default_elementary_number")]
        number: u8,
    },
    /// Ising model with Metropolis acceptance.
    Ising {
        /// Temperature in units of `J / k_B`.
        #[serde(default = "default_temperature")]
        temperature: f64,
        /// Update one checkerboard sublattice per generation.
        #[serde(default)]
        checkerboard: bool,
    },
    /// Heat diffusion.
    Diffusion {
        /// Diffusion coefficient `D`.
        #[serde(default = "default_diffusion_coefficient")]
        coefficient: f32,
        /// Time step.
        #[serde(default = "default_dt")]
        dt: f32,
    },
    /// Gray-Scott reaction-diffusion.
    GrayScott {
        /// Named feed/kill pair.
        #[serde(default = "default_gray_scott_preset")]
        preset: GrayScottPreset,
        /// Feed rate, overriding the preset's.
        #[serde(default)]
        feed: Option<f32>,
        /// Kill rate, overriding the preset's.
        #[serde(default)]
        kill: Option<f32>,
        /// Diffusion rate of `U`.
        #[serde(default = "default_diffusion_u")]
        diffusion_u: f32,
        /// Diffusion rate of `V`.
        #[serde(default = "default_diffusion_v")]
        diffusion_v: f32,
        /// Time step.
        #[serde(default = "default_dt")]
        dt: f32,
    },
    /// Abelian sandpile.
    Sandpile {
        /// Toppling threshold.
        #[serde(default = "default_capacity")]
        capacity: u32,
        /// Grains dropped per generation.
        #[serde(default = "default_grains")]
        grains: u32,
        /// Where grains land.
        #[serde(default)]
        site: DropSite,
    },
    /// Site percolation searched one BFS layer per generation.
    Percolation,
}

fn default_rulestring() -> String {
    CONWAY.to_owned()
}

const fn default_cyclic_states() -> u8 {
    16
}

const fn default_cyclic_threshold() -> usize {
    1
}

const fn default_cyclic_neighborhood() -> Neighborhood {
    Neighborhood::VonNeumann
}

const fn default_elementary_number() -> u8 {
    30
}

const fn default_temperature() -> f64 {
    CRITICAL_TEMPERATURE
}

const fn default_diffusion_coefficient() -> f32 {
    0.22
}

const fn default_dt() -> f32 {
    1.0
}

const fn default_gray_scott_preset() -> GrayScottPreset {
    GrayScottPreset::Spots
}

const fn default_diffusion_u() -> f32 {
    0.16
}

const fn default_diffusion_v() -> f32 {
    0.08
}

const fn default_capacity() -> u32 {
    tessera_rules::sandpile::DEFAULT_CAPACITY
}

const fn default_grains() -> u32 {
    1
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::LifeLike {
            rulestring: default_rulestring(),
        }
    }
}

impl RuleConfig {
    /// The `kind` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LifeLike { .. } => "life_like",
            Self::Wireworld => "wireworld",
            Self::BriansBrain => "brians_brain",
            Self::Cyclic { .. } => "cyclic",
            Self::Elementary { .. } => "elementary",
            Self::Ising { .. } => "ising",
            Self::Diffusion { .. } => "diffusion",
            Self::GrayScott { .. } => "gray_scott",
            Self::Sandpile { .. } => "sandpile",
            Self::Percolation => "percolation",
        }
    }

    /// Number of distinct `u8` states for small-state rules, `None` for
    /// continuous, sandpile, and percolation rules.
    pub fn states(&self) -> Option<u16> {
        match self {
            Self::LifeLike { .. } | Self::Elementary { .. } | Self::Ising { .. } => Some(2),
            Self::BriansBrain => Some(3),
            Self::Wireworld => Some(4),
            Self::Cyclic { states, .. } => Some(u16::from(*states)),
            Self::Diffusion { .. } | Self::GrayScott { .. } | Self::Sandpile { .. } | Self::Percolation => None,
        }
    }

    /// The built-in color scheme for this rule.
    pub fn default_scheme(&self) -> ColorScheme {
        match self {
            Self::LifeLike { .. } | Self::Elementary { .. } => presets::two_state(presets::AMBER),
            Self::Wireworld => presets::wireworld(),
            Self::BriansBrain => presets::brians_brain(),
            Self::Cyclic { states, .. } => presets::cyclic(*states),
            Self::Ising { .. } => presets::ising(),
            Self::Diffusion { .. } => presets::heat(),
            Self::GrayScott { .. } => presets::reaction(),
            Self::Sandpile { .. } => presets::sandpile(),
            Self::Percolation => presets::percolation(),
        }
    }
}

/// Pixel output settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    /// Pixels per cell along each axis.
    #[serde(default = "default_cell_scale")]
    pub cell_scale: usize,

    /// Background pixels on the top and left of each cell block.
    #[serde(default)]
    pub cell_gap: usize,

    /// Block or per-pixel sampled rendering.
    #[serde(default)]
    pub mode: RenderMode,

    /// Gap, margin, and fade color.
    #[serde(default = "default_background")]
    pub background: Rgb,

    /// Color scheme. `None` uses the rule's built-in scheme.
    #[serde(default)]
    pub colors: Option<ColorScheme>,

    /// Redraw only changed cells between full redraws.
    #[serde(default = "default_incremental")]
    pub incremental: bool,
}

const fn default_cell_scale() -> usize {
    4
}

const fn default_background() -> Rgb {
    presets::BACKGROUND
}

const fn default_incremental() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cell_scale: default_cell_scale(),
            cell_gap: 0,
            mode: RenderMode::default(),
            background: default_background(),
            colors: None,
            incremental: default_incremental(),
        }
    }
}

impl RenderConfig {
    /// The renderer settings part of this section.
    pub const fn settings(&self) -> RenderSettings {
        RenderSettings {
            cell_scale: self.cell_scale,
            cell_gap: self.cell_gap,
            mode: self.mode,
            background: self.background,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.settings()
            .validate()
            .map_err(|err| ConfigError::invalid(format!("render: {err}")))?;
        if let Some(colors) = &self.colors {
            colors
                .build()
                .map_err(|err| ConfigError::invalid(format!("render.colors: {err}")))?;
        }
        Ok(())
    }
}

/// Stage termination and what follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TerminationConfig {
    /// Generation budget for stages that set none of their own.
    #[serde(default)]
    pub max_generations: Option<u64>,

    /// End the stage when a generation changes nothing.
    #[serde(default)]
    pub quiescence: bool,

    /// End a percolation stage once its search has finished.
    #[serde(default = "default_stop_when_search_done")]
    pub stop_when_search_done: bool,

    /// Give up on a stage after this many generations and report it as
    /// stalled.
    #[serde(default)]
    pub stall_cap: Option<u64>,

    /// How long to hold the final frame, in milliseconds.
    #[serde(default)]
    pub pause_ms: u64,

    /// Cross-fade to the background before the next stage, in
    /// milliseconds. Zero switches immediately.
    #[serde(default)]
    pub fade_ms: u64,

    /// What happens after the last stage's pause.
    #[serde(default)]
    pub after_pause: AfterPause,
}

const fn default_stop_when_search_done() -> bool {
    true
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            max_generations: None,
            quiescence: false,
            stop_when_search_done: default_stop_when_search_done(),
            stall_cap: None,
            pause_ms: 0,
            fade_ms: 0,
            after_pause: AfterPause::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error) used when
    /// `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.rule.kind(), "life_like");
        assert_eq!(config.grid.width, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r##"
simulation:
  name: ising-sweep
  seed: 42
  determinism: strict
grid:
  width: 120
  height: 80
  boundary: toroidal
rule:
  kind: ising
  temperature: 1.5
  checkerboard: true
seeding:
  kind: random
  density: 0.5
render:
  cell_scale: 3
  colors:
    kind: palette
    colors: ["#1a1a1a", "#c8922a"]
cadence:
  kind: fixed
  frame_interval_ms: 33
  generations_per_frame: 4
stages:
  - label: cold
    temperature: 1.13
    duration_ms: 5000
    reseed: false
  - label: hot
    temperature: 4.5
    duration_ms: 5000
    reseed: false
termination:
  after_pause: cycle
logging:
  level: debug
  json: true
"##;
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.grid.width, 120);
        assert_eq!(
            config.rule,
            RuleConfig::Ising {
                temperature: 1.5,
                checkerboard: true
            }
        );
        assert_eq!(config.render.cell_scale, 3);
        assert!(config.render.colors.is_some());
        assert_eq!(config.stages.len(), 2);
        assert!(!config.stages.first().unwrap().reseed);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        config.validate().unwrap();
    }

    #[test]
    fn strict_determinism_requires_a_seed() {
        let config = SimulationConfig::parse("simulation:\n  determinism: strict\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let config = SimulationConfig::parse("grid:\n  width: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_rule_parameters_are_rejected() {
        let unstable = SimulationConfig::parse("rule:\n  kind: diffusion\n  coefficient: 0.5\n").unwrap();
        assert!(unstable.validate().is_err());

        let frozen = SimulationConfig::parse("rule:\n  kind: ising\n  temperature: 0.0\n").unwrap();
        assert!(frozen.validate().is_err());

        let garbled = SimulationConfig::parse("rule:\n  kind: life_like\n  rulestring: B9/S\n").unwrap();
        assert!(garbled.validate().is_err());
    }

    #[test]
    fn stage_overrides_must_fit_the_rule() {
        let yaml = "rule:\n  kind: wireworld\nstages:\n  - temperature: 2.0\n";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_rule_kind_fails_to_parse() {
        assert!(SimulationConfig::parse("rule:\n  kind: langtons_ant\n").is_err());
    }

    #[test]
    fn load_project_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tessera-config.yaml");
        let config = SimulationConfig::from_file(&path).unwrap();
        config.validate().unwrap();
    }
}
