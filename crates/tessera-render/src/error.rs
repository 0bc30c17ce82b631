//! Error types for the `tessera-render` crate.

/// Errors raised while building color maps or writing pixels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A color scheme or render setting is unusable.
    #[error("invalid render configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// A color string could not be parsed.
    #[error("invalid color '{value}': expected #rrggbb")]
    InvalidColor {
        /// The rejected input.
        value: String,
    },

    /// A surface buffer does not hold `width * height * 4` bytes.
    #[error("surface buffer holds {found} bytes, expected {expected}")]
    SurfaceSize {
        /// Required byte length.
        expected: usize,
        /// Actual byte length.
        found: usize,
    },
}

impl RenderError {
    /// Shorthand for [`RenderError::InvalidConfig`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
