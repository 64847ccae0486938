//! Error types for report and remote assertion operations.

use std::fmt;

use assertion_binding::BindingError;
use serde::{Deserialize, Serialize};

/// Message returned to peers for every report or assertion rejection.
pub const VERIFICATION_FAILED_MESSAGE: &str = "verification failed";

/// Message returned to peers for every failed call to an assertion generator.
pub const TRANSPORT_FAILED_MESSAGE: &str = "assertion generator request failed";

/// Errors that can occur while producing or checking assertions.
///
/// The variants carry detailed reasons for local diagnostics. Responses sent
/// to a peer must go through [`AssertionError::public_code`] and
/// [`AssertionError::public_message`], which do not distinguish a malformed
/// report from a forged one, nor one transport failure from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// An input value was malformed or a required field was unset.
    InvalidArgument {
        /// Name of the offending field
        field: &'static str,
        /// Description of what was wrong
        reason: String,
    },
    /// A one-shot value was assigned twice.
    AlreadyInitialized,
    /// A value was used before it was assigned.
    NotInitialized,
    /// A wire structure could not be decoded.
    DecodingError {
        /// Description of the decoding error
        reason: String,
    },
    /// A well-formed report or assertion failed verification.
    VerificationFailure {
        /// Description of the failed check
        reason: String,
    },
    /// A primitive or identity query failed.
    Internal {
        /// Error message
        message: String,
    },
    /// The channel to a remote service failed.
    Transport {
        /// Description of the transport failure
        reason: String,
    },
}

/// Machine-readable error codes carried in failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed input
    InvalidArgument,
    /// One-shot value assigned twice
    AlreadyInitialized,
    /// Value used before assignment
    NotInitialized,
    /// Wire structure could not be decoded; never sent to peers
    DecodingFailed,
    /// Report or assertion rejected
    VerificationFailed,
    /// Internal failure
    Internal,
    /// Channel or RPC failure
    Transport,
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { field, reason } => {
                write!(f, "invalid argument '{field}': {reason}")
            }
            Self::AlreadyInitialized => write!(f, "value is already initialized"),
            Self::NotInitialized => write!(f, "value is not initialized"),
            Self::DecodingError { reason } => write!(f, "decoding failed: {reason}"),
            Self::VerificationFailure { reason } => {
                write!(f, "verification failed: {reason}")
            }
            Self::Internal { message } => write!(f, "internal error: {message}"),
            Self::Transport { reason } => {
                write!(
                    f,
                    "transport error: {reason}; the request was not retried"
                )
            }
        }
    }
}

impl std::error::Error for AssertionError {}

impl From<BindingError> for AssertionError {
    fn from(err: BindingError) -> Self {
        match err {
            BindingError::InvalidArgument { field, reason } => {
                Self::InvalidArgument { field, reason }
            }
            BindingError::AlreadyInitialized => Self::AlreadyInitialized,
            BindingError::NotInitialized => Self::NotInitialized,
            BindingError::Internal { message } => Self::Internal { message },
        }
    }
}

impl AssertionError {
    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a `DecodingError`.
    #[must_use]
    pub fn decoding(reason: impl Into<String>) -> Self {
        Self::DecodingError {
            reason: reason.into(),
        }
    }

    /// Creates a `VerificationFailure`.
    #[must_use]
    pub fn verification(reason: impl Into<String>) -> Self {
        Self::VerificationFailure {
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

    /// Creates a `Transport` error.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Returns the code describing this error for local diagnostics.
    ///
    /// Decoding failures keep their own code here; use
    /// [`public_code`](Self::public_code) for anything sent to a peer.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::DecodingError { .. } => ErrorCode::DecodingFailed,
            Self::AlreadyInitialized => ErrorCode::AlreadyInitialized,
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::VerificationFailure { .. } => ErrorCode::VerificationFailed,
            Self::Internal { .. } => ErrorCode::Internal,
            Self::Transport { .. } => ErrorCode::Transport,
        }
    }

    /// Returns the code that may be disclosed to an unauthenticated peer.
    #[must_use]
    pub const fn public_code(&self) -> ErrorCode {
        if self.is_rejection() {
            ErrorCode::VerificationFailed
        } else {
            self.code()
        }
    }

    /// Returns the message that may be disclosed to an unauthenticated peer.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::DecodingError { .. } | Self::VerificationFailure { .. } => {
                VERIFICATION_FAILED_MESSAGE.to_string()
            }
            Self::Transport { .. } => TRANSPORT_FAILED_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Returns true for malformed or forged reports and assertions.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::DecodingError { .. } | Self::VerificationFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_and_verification_look_identical_publicly() {
        let decoding = AssertionError::decoding("report is 3 bytes, expected 256");
        let forged = AssertionError::verification("bad authentication tag");

        assert_eq!(decoding.public_code(), forged.public_code());
        assert_eq!(decoding.public_message(), forged.public_message());
        assert_eq!(decoding.public_message(), VERIFICATION_FAILED_MESSAGE);
    }

    #[test]
    fn local_codes_keep_detail() {
        assert_eq!(
            AssertionError::decoding("x").code(),
            ErrorCode::DecodingFailed
        );
        assert_eq!(
            AssertionError::verification("x").code(),
            ErrorCode::VerificationFailed
        );
        assert!(
            AssertionError::verification("bad tag")
                .to_string()
                .contains("bad tag")
        );
    }

    #[test]
    fn other_errors_are_disclosed() {
        let err = AssertionError::invalid_argument("server_address", "must not be empty");
        assert_eq!(err.public_code(), ErrorCode::InvalidArgument);
        assert!(err.public_message().contains("server_address"));

    }

    #[test]
    fn transport_failures_look_identical_publicly() {
        let refused = AssertionError::transport("connection refused");
        let rejected = AssertionError::transport("attested channel failed: bad tag");

        assert_eq!(refused.public_code(), ErrorCode::Transport);
        assert_eq!(refused.public_code(), rejected.public_code());
        assert_eq!(refused.public_message(), rejected.public_message());
        assert_eq!(refused.public_message(), TRANSPORT_FAILED_MESSAGE);
        assert!(refused.to_string().contains("connection refused"));
    }

    #[test]
    fn binding_errors_convert() {
        assert_eq!(
            AssertionError::from(BindingError::NotInitialized),
            AssertionError::NotInitialized
        );
        assert_eq!(
            AssertionError::from(BindingError::internal("boom")),
            AssertionError::internal("boom")
        );
    }

    #[test]
    fn error_codes_serialize_snake_case() {
        let json = serde_json::to_string(&ErrorCode::VerificationFailed).unwrap();
        assert_eq!(json, "\"verification_failed\"");
    }
}
