//! Error types for itemflow-core.

use thiserror::Error;

/// Result type alias for itemflow-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in itemflow-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is empty or whitespace.
    #[error("validation error: '{0}' must not be blank")]
    BlankField(&'static str),

    /// Email does not match the accepted address format.
    #[error("validation error: invalid email '{0}'")]
    InvalidEmail(String),

    /// Item id could not be parsed.
    #[error("invalid item id: {0}")]
    InvalidId(String),

    /// No id is left after the largest stored one.
    #[error("item ids exhausted")]
    IdsExhausted,
}

impl CoreError {
    /// Whether this error was raised by field validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::BlankField(_) | Self::InvalidEmail(_))
    }
}
