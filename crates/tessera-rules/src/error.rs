//! Error types for the `tessera-rules` crate.

use tessera_grid::GridError;

/// Errors raised while building rules or running generations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// Rule parameters are out of range or contradictory.
    #[error("invalid rule configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// A rule or grid contract was broken (wrong buffer size, a neighbor
    /// count that does not match the neighborhood, ...). This is a defect,
    /// not a recoverable runtime condition.
    #[error("invariant violation: {reason}")]
    InvariantViolation {
        /// Description of the broken invariant.
        reason: String,
    },

    /// An underlying grid operation failed.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },
}

impl RuleError {
    /// Shorthand for [`RuleError::InvalidConfig`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`RuleError::InvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }
}
