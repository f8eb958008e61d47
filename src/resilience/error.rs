//! Error taxonomy for the guards.
//!
//! Guards never swallow errors. They either add one of their own kinds
//! (`CircuitOpenError`, `CallTimeoutError`) or hand the operation's error
//! back untouched, so callers can tell "a guard intervened" apart from
//! "the operation itself failed".

use std::time::Duration;
use thiserror::Error;

/// The breaker is fast-failing; the operation was not invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit '{breaker}' is open; retry in {retry_after:?}")]
pub struct CircuitOpenError {
    /// Name of the breaker that rejected the call.
    pub breaker: String,
    /// Time left until the breaker admits a trial call.
    pub retry_after: Duration,
}

/// The call did not complete within its bound.
///
/// The underlying work may still be in flight when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("call timed out after {bound:?}")]
pub struct CallTimeoutError {
    /// The configured bound that was exceeded.
    pub bound: Duration,
}

/// Rejected guard parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGuardConfig {
    #[error("failure threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("timeout bound must be greater than zero")]
    ZeroTimeoutBound,
}

/// Result of a guarded operation whose own error type is `E`.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    #[error(transparent)]
    Timeout(#[from] CallTimeoutError),

    /// The operation's own failure, passed through unchanged.
    #[error("{0}")]
    Operation(E),
}

impl<E> GuardError<E> {
    /// True when a guard intervened rather than the operation failing.
    pub fn is_guard_error(&self) -> bool {
        !matches!(self, GuardError::Operation(_))
    }

    /// The operation's own error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            GuardError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for guarded calls.
pub type GuardResult<T, E> = Result<T, GuardError<E>>;
