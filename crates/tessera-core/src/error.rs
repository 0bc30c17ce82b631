//! Error types for the `tessera-core` crate.
//!
//! Lower layers report through [`RuleError`], [`RenderError`] and
//! [`GridError`]. They are folded into [`SimulationError`] by meaning, not
//! by origin: every bad parameter becomes [`SimulationError::InvalidConfig`]
//! and every broken contract becomes [`SimulationError::InvariantViolation`].

use tessera_grid::GridError;
use tessera_render::RenderError;
use tessera_rules::RuleError;

use crate::config::ConfigError;

/// Errors raised while creating or advancing a simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is malformed or self-contradictory. Returned by
    /// `create` before anything is built.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A grid, rule, or surface contract was broken. The handle stops
    /// stepping after reporting one.
    #[error("invariant violation: {reason}")]
    InvariantViolation {
        /// Which contract failed.
        reason: String,
    },

    /// A grid operation failed outside of rule evaluation.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },
}

impl SimulationError {
    /// Shorthand for [`SimulationError::InvalidConfig`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }

    /// Shorthand for [`SimulationError::InvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation { reason: reason.into() }
    }
}

impl From<RuleError> for SimulationError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::InvalidConfig { reason } => Self::InvalidConfig { reason },
            RuleError::InvariantViolation { reason } => Self::InvariantViolation { reason },
            RuleError::Grid { source } => Self::Grid { source },
        }
    }
}

impl From<RenderError> for SimulationError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::SurfaceSize { .. } => Self::invariant(err.to_string()),
            RenderError::InvalidConfig { .. } | RenderError::InvalidColor { .. } => {
                Self::invalid(err.to_string())
            }
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { reason } => Self::InvalidConfig { reason },
            ConfigError::Io { .. } | ConfigError::Yaml { .. } => Self::invalid(err.to_string()),
        }
    }
}
