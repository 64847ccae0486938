//! Error types for transcript and AAD operations.

use std::fmt;

/// Errors that can occur while building transcripts or AAD values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// An input value was malformed.
    InvalidArgument {
        /// Name of the offending argument
        field: &'static str,
        /// Description of what was wrong
        reason: String,
    },
    /// A hasher was already assigned to the transcript.
    AlreadyInitialized,
    /// A digest was requested before a hasher was assigned.
    NotInitialized,
    /// A primitive or constant could not be resolved.
    Internal {
        /// Error message
        message: String,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { field, reason } => {
                write!(f, "invalid argument '{field}': {reason}")
            }
            Self::AlreadyInitialized => {
                write!(
                    f,
                    "transcript hasher is already set; a transcript accepts exactly one hasher"
                )
            }
            Self::NotInitialized => {
                write!(
                    f,
                    "transcript has no hasher; call set_hasher before requesting a digest"
                )
            }
            Self::Internal { message } => {
                write!(f, "internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BindingError {}

impl BindingError {
    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
