//! Frame cadence: how often the scheduler steps and how many generations
//! each stepping frame runs.
//!
//! A frame that arrives before `frame_interval_ms` has passed since the
//! previous stepping frame is skipped. Batching only changes how many
//! generations land between two renders; the generations themselves are
//! the same either way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Stepping cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cadence {
    /// The same batch every frame.
    Fixed {
        /// Minimum time between stepping frames, in milliseconds.
        #[serde(default = "default_frame_interval_ms")]
        frame_interval_ms: u64,
        /// Generations per stepping frame.
        #[serde(default = "default_generations_per_frame")]
        generations_per_frame: u32,
    },
    /// A batch that grows with the stage's generation count, so long
    /// stages keep roughly the same wall-clock pacing as short ones.
    Adaptive {
        /// Minimum time between stepping frames, in milliseconds.
        #[serde(default = "default_frame_interval_ms")]
        frame_interval_ms: u64,
        /// Batch size at generation 0.
        #[serde(default = "default_generations_per_frame")]
        base: u32,
        /// Generations between each +1 to the batch.
        #[serde(default = "default_ramp_every")]
        ramp_every: u64,
        /// Upper bound on the batch.
        #[serde(default = "default_max_batch")]
        max: u32,
    },
}

const fn default_frame_interval_ms() -> u64 {
    16
}

const fn default_generations_per_frame() -> u32 {
    1
}

const fn default_ramp_every() -> u64 {
    100
}

const fn default_max_batch() -> u32 {
    16
}

impl Default for Cadence {
    fn default() -> Self {
        Self::Fixed {
            frame_interval_ms: default_frame_interval_ms(),
            generations_per_frame: default_generations_per_frame(),
        }
    }
}

impl Cadence {
    /// Minimum time between stepping frames.
    pub const fn frame_interval(&self) -> Duration {
        match self {
            Self::Fixed { frame_interval_ms, .. } | Self::Adaptive { frame_interval_ms, .. } => {
                Duration::from_millis(*frame_interval_ms)
            }
        }
    }

    /// Generations to run in the next stepping frame.
    pub fn batch(&self, stage_generation: u64) -> u32 {
        match *self {
            Self::Fixed {
                generations_per_frame,
                ..
            } => generations_per_frame,
            Self::Adaptive {
                base, ramp_every, max, ..
            } => {
                let ramp = stage_generation.checked_div(ramp_every).unwrap_or(0);
                let ramp = u32::try_from(ramp).unwrap_or(u32::MAX);
                base.saturating_add(ramp).min(max)
            }
        }
    }

    /// Return `true` if enough time has passed since `last` to step again.
    pub fn is_due(&self, last: Option<Duration>, now: Duration) -> bool {
        last.is_none_or(|last| now.saturating_sub(last) >= self.frame_interval())
    }

    /// Reject batches that would never step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Fixed {
                generations_per_frame: 0,
                ..
            } => Err(ConfigError::invalid("cadence.generations_per_frame must be at least 1")),
            Self::Adaptive { base: 0, .. } => Err(ConfigError::invalid("cadence.base must be at least 1")),
            Self::Adaptive { ramp_every: 0, .. } => {
                Err(ConfigError::invalid("cadence.ramp_every must be at least 1"))
            }
            Self::Adaptive { base, max, .. } if max < base => {
                Err(ConfigError::invalid("cadence.max must not be below cadence.base"))
            }
            Self::Fixed { .. } | Self::Adaptive { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_batch_ramps_then_caps() {
        let cadence = Cadence::Adaptive {
            frame_interval_ms: 16,
            base: 2,
            ramp_every: 50,
            max: 5,
        };
        assert_eq!(cadence.batch(0), 2);
        assert_eq!(cadence.batch(49), 2);
        assert_eq!(cadence.batch(50), 3);
        assert_eq!(cadence.batch(10_000), 5);
    }

    #[test]
    fn throttle_skips_early_frames() {
        let cadence = Cadence::Fixed {
            frame_interval_ms: 80,
            generations_per_frame: 1,
        };
        let last = Some(Duration::from_millis(100));
        assert!(cadence.is_due(None, Duration::ZERO));
        assert!(!cadence.is_due(last, Duration::from_millis(179)));
        assert!(cadence.is_due(last, Duration::from_millis(180)));
    }

    #[test]
    fn zero_batches_are_rejected() {
        let fixed = Cadence::Fixed {
            frame_interval_ms: 16,
            generations_per_frame: 0,
        };
        assert!(fixed.validate().is_err());
        let inverted = Cadence::Adaptive {
            frame_interval_ms: 16,
            base: 4,
            ramp_every: 10,
            max: 2,
        };
        assert!(inverted.validate().is_err());
        assert!(Cadence::default().validate().is_ok());
    }

    #[test]
    fn parses_from_yaml() {
        let cadence: Cadence = serde_yml::from_str("kind: adaptive\nbase: 3\n").unwrap();
        assert_eq!(
            cadence,
            Cadence::Adaptive {
                frame_interval_ms: 16,
                base: 3,
                ramp_every: 100,
                max: 16,
            }
        );
    }
}
