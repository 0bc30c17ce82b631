//! Stages and phases.
//!
//! A simulation cycles through one or more stages. Each stage may patch
//! the base rule and seeding, and carries its own termination budget.
//! Within a stage the scheduler walks the phase machine:
//!
//! ```text
//! Seeding -> Running -> Pausing -> Transitioning -> Seeding (next stage)
//!                                \-> Complete
//! ```
//!
//! [`Stage`] is the scheduler's bookkeeping for the current stage. Only
//! the handle mutates it; rules and the renderer never see it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_rules::GrayScottPreset;

use crate::config::{ConfigError, RuleConfig};
use crate::patterns::Anchor;
use crate::seeding::SeedingConfig;

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The grid has been populated and will be drawn on the next frame.
    Seeding,
    /// Generations are being stepped and rendered.
    Running,
    /// The final frame of a stage is being held.
    Pausing,
    /// Fading out before the next stage.
    Transitioning,
    /// Terminal: no further stepping.
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Pausing => "pausing",
            Self::Transitioning => "transitioning",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Why a stage stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The percolation search finished.
    SearchDone,
    /// A generation changed nothing.
    Quiescent,
    /// The stage's generation budget was used up.
    BudgetReached,
    /// The stage's wall-clock duration elapsed.
    DurationElapsed,
    /// The stall cap was hit before any other predicate held.
    Stalled,
}

/// What follows the pause at the end of the last stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterPause {
    /// Wrap around to the first stage.
    #[default]
    Cycle,
    /// Stop for good.
    Complete,
}

/// One entry of the `stages` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageConfig {
    /// Display label. Defaults to `stage N`.
    #[serde(default)]
    pub label: Option<String>,

    /// Generation budget for this stage.
    #[serde(default)]
    pub generations: Option<u64>,

    /// Wall-clock duration of the running phase, in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Repopulate the grid on entry. When `false` the new parameters act
    /// on whatever the previous stage left behind.
    #[serde(default = "default_reseed")]
    pub reseed: bool,

    /// Ising temperature.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Gray-Scott preset.
    #[serde(default)]
    pub preset: Option<GrayScottPreset>,

    /// Gray-Scott feed rate.
    #[serde(default)]
    pub feed: Option<f32>,

    /// Gray-Scott kill rate.
    #[serde(default)]
    pub kill: Option<f32>,

    /// Life-like rulestring.
    #[serde(default)]
    pub rulestring: Option<String>,

    /// Percolation site-open probability.
    #[serde(default)]
    pub probability: Option<f64>,

    /// Named pattern to stamp.
    #[serde(default)]
    pub pattern: Option<String>,
}

const fn default_reseed() -> bool {
    true
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            label: None,
            generations: None,
            duration_ms: None,
            reseed: default_reseed(),
            temperature: None,
            preset: None,
            feed: None,
            kill: None,
            rulestring: None,
            probability: None,
            pattern: None,
        }
    }
}

impl StageConfig {
    /// The base rule with this stage's overrides applied.
    pub fn effective_rule(&self, base: &RuleConfig) -> Result<RuleConfig, ConfigError> {
        let mut rule = base.clone();
        if let Some(value) = self.temperature {
            let RuleConfig::Ising { temperature, .. } = &mut rule else {
                return Err(mismatch("temperature", base));
            };
            *temperature = value;
        }
        if self.preset.is_some() || self.feed.is_some() || self.kill.is_some() {
            let RuleConfig::GrayScott {
                preset, feed, kill, ..
            } = &mut rule
            else {
                return Err(mismatch("preset/feed/kill", base));
            };
            if let Some(value) = self.preset {
                *preset = value;
                *feed = None;
                *kill = None;
            }
            if self.feed.is_some() {
                *feed = self.feed;
            }
            if self.kill.is_some() {
                *kill = self.kill;
            }
        }
        if let Some(value) = &self.rulestring {
            let RuleConfig::LifeLike { rulestring } = &mut rule else {
                return Err(mismatch("rulestring", base));
            };
            rulestring.clone_from(value);
        }
        if self.probability.is_some() && !matches!(base, RuleConfig::Percolation) {
            return Err(mismatch("probability", base));
        }
        if self.pattern.is_some() && base.states().is_none() {
            return Err(mismatch("pattern", base));
        }
        Ok(rule)
    }

    /// The base seeding, resolved for `rule`, with this stage's
    /// overrides applied.
    pub fn effective_seeding(&self, base: &SeedingConfig, rule: &RuleConfig) -> SeedingConfig {
        let mut seeding = base.resolved(rule);
        if let Some(probability) = self.probability {
            seeding = SeedingConfig::Percolation { probability };
        }
        if let Some(name) = &self.pattern {
            let anchor = match &seeding {
                SeedingConfig::Pattern { anchor, .. } => *anchor,
                _ => Anchor::default(),
            };
            seeding = SeedingConfig::Pattern {
                name: Some(name.clone()),
                cells: None,
                value: 1,
                anchor,
            };
        }
        seeding
    }

    /// Label shown for the stage at `index`.
    pub fn label_for(&self, index: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("stage {}", index.saturating_add(1)))
    }

    /// Range checks that do not depend on the rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generations == Some(0) {
            return Err(ConfigError::invalid("generations must be at least 1"));
        }
        if self.probability.is_some() && !self.reseed {
            return Err(ConfigError::invalid(
                "a probability override only takes effect when reseed is true",
            ));
        }
        if self.pattern.is_some() && !self.reseed {
            return Err(ConfigError::invalid(
                "a pattern override only takes effect when reseed is true",
            ));
        }
        Ok(())
    }
}

fn mismatch(field: &str, rule: &RuleConfig) -> ConfigError {
    ConfigError::invalid(format!("{field} override does not apply to a {} rule", rule.kind()))
}

/// Scheduler bookkeeping for the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    index: usize,
    phase: Phase,
    phase_started: Option<Duration>,
    running_started: Option<Duration>,
    generation: u64,
    outcome: Option<StageOutcome>,
}

impl Stage {
    /// A fresh stage in [`Phase::Seeding`].
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            phase: Phase::Seeding,
            phase_started: None,
            running_started: None,
            generation: 0,
            outcome: None,
        }
    }

    /// Position in the stage list.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Generations completed in this stage.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Why the stage stopped running, once it has.
    pub const fn outcome(&self) -> Option<StageOutcome> {
        self.outcome
    }

    /// Move to `phase` at host time `now`.
    pub const fn enter(&mut self, phase: Phase, now: Duration) {
        self.phase = phase;
        self.phase_started = Some(now);
        if matches!(phase, Phase::Running) && self.running_started.is_none() {
            self.running_started = Some(now);
        }
    }

    /// Time spent in the current phase.
    pub fn phase_elapsed(&self, now: Duration) -> Duration {
        self.phase_started
            .map_or(Duration::ZERO, |started| now.saturating_sub(started))
    }

    /// Time spent since the stage first started running.
    pub fn running_elapsed(&self, now: Duration) -> Duration {
        self.running_started
            .map_or(Duration::ZERO, |started| now.saturating_sub(started))
    }

    /// Count one completed generation.
    pub const fn record_generation(&mut self) {
        self.generation = self.generation.saturating_add(1);
    }

    /// Stop running for `outcome`.
    pub const fn finish(&mut self, outcome: StageOutcome, now: Duration) {
        self.outcome = Some(outcome);
        self.enter(Phase::Pausing, now);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ising() -> RuleConfig {
        RuleConfig::Ising {
            temperature: 2.0,
            checkerboard: false,
        }
    }

    #[test]
    fn temperature_override_patches_ising() {
        let stage = StageConfig {
            temperature: Some(4.5),
            ..StageConfig::default()
        };
        let rule = stage.effective_rule(&ising()).unwrap();
        assert_eq!(
            rule,
            RuleConfig::Ising {
                temperature: 4.5,
                checkerboard: false
            }
        );
    }

    #[test]
    fn preset_override_clears_explicit_rates() {
        let base = RuleConfig::GrayScott {
            preset: GrayScottPreset::Spots,
            feed: Some(0.01),
            kill: Some(0.05),
            diffusion_u: 0.16,
            diffusion_v: 0.08,
            dt: 1.0,
        };
        let stage = StageConfig {
            preset: Some(GrayScottPreset::Maze),
            ..StageConfig::default()
        };
        let RuleConfig::GrayScott {
            preset, feed, kill, ..
        } = stage.effective_rule(&base).unwrap()
        else {
            panic!("expected gray-scott");
        };
        assert_eq!(preset, GrayScottPreset::Maze);
        assert!(feed.is_none() && kill.is_none());
    }

    #[test]
    fn overrides_for_another_rule_are_rejected() {
        let stage = StageConfig {
            rulestring: Some("B36/S23".to_owned()),
            ..StageConfig::default()
        };
        assert!(stage.effective_rule(&ising()).is_err());
    }

    #[test]
    fn probability_override_replaces_seeding() {
        let stage = StageConfig {
            probability: Some(0.45),
            ..StageConfig::default()
        };
        let seeding = stage.effective_seeding(&SeedingConfig::Auto, &RuleConfig::Percolation);
        assert_eq!(seeding, SeedingConfig::Percolation { probability: 0.45 });
    }

    #[test]
    fn stage_tracks_phase_time() {
        let mut stage = Stage::new(0);
        assert_eq!(stage.phase(), Phase::Seeding);
        stage.enter(Phase::Running, Duration::from_millis(100));
        stage.record_generation();
        assert_eq!(stage.generation(), 1);
        assert_eq!(stage.running_elapsed(Duration::from_millis(350)), Duration::from_millis(250));

        stage.finish(StageOutcome::BudgetReached, Duration::from_millis(400));
        assert_eq!(stage.phase(), Phase::Pausing);
        assert_eq!(stage.outcome(), Some(StageOutcome::BudgetReached));
        assert_eq!(stage.phase_elapsed(Duration::from_millis(450)), Duration::from_millis(50));
    }
}
