//! Error types for MoneyBee
//!
//! The taxonomy is transport-independent; the API layer maps each kind to
//! an HTTP status. `Aborted` and `Unavailable` carry an implicit
//! retry-is-safe contract for the caller.

use thiserror::Error;

/// Result type for MoneyBee operations
pub type Result<T> = std::result::Result<T, MoneyBeeError>;

/// MoneyBee error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyBeeError {
    /// Malformed input: missing idempotency key, non-positive amount,
    /// unknown currency. Not retried.
    #[error("{0}")]
    InvalidArgument(String),

    /// Sender, receiver, or transfer absent
    #[error("{0}")]
    NotFound(String),

    /// Business-rule rejection: inactive sender, blocked receiver, daily
    /// limit, approval wait, non-Pending state, high fraud risk
    #[error("{0}")]
    FailedPrecondition(String),

    /// Receiver identity mismatch or invalid API key
    #[error("{0}")]
    PermissionDenied(String),

    /// Optimistic-concurrency retries exhausted or lock busy past the
    /// retry budget. Safe for the caller to retry.
    #[error("{0}")]
    Aborted(String),

    /// Collaborator timeout or circuit open. Retryable after backoff.
    #[error("{0}")]
    Unavailable(String),

    /// Unexpected failure; logged with correlation id
    #[error("{0}")]
    Internal(String),
}

impl MoneyBeeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::FailedPrecondition(_) => "FAILED_PRECONDITION",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Aborted(_) => "ABORTED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the caller may safely retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Aborted(_) | Self::Unavailable(_))
    }
}
