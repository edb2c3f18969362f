//! Errors surfaced by a protected call.

use thiserror::Error;

use crate::resilience::types::BreakerKey;

/// Outcome of `execute` when it does not return the call's value.
///
/// Only `CircuitOpen` originates in the breaker; the other variants carry
/// what happened to the protected call itself.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The call was rejected without being invoked.
    #[error("circuit open for {key}; next retry at {next_retry_time_ms}ms")]
    CircuitOpen {
        key: BreakerKey,
        next_retry_time_ms: u64,
    },

    /// The protected call failed; the original error is returned untouched.
    #[error(transparent)]
    Call(E),

    /// The protected call did not finish before its deadline.
    #[error("call to {key} timed out after {after_ms}ms")]
    Timeout { key: BreakerKey, after_ms: u64 },
}

impl<E> BreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BreakerError::CircuitOpen { .. })
    }

    /// The underlying call error, if that is what this is.
    pub fn into_call_error(self) -> Option<E> {
        match self {
            BreakerError::Call(e) => Some(e),
            _ => None,
        }
    }
}

/// Admission refusal returned by `try_acquire`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit open for {key}; next retry at {next_retry_time_ms}ms")]
pub struct CircuitOpenError {
    pub key: BreakerKey,
    pub next_retry_time_ms: u64,
}

impl<E> From<CircuitOpenError> for BreakerError<E> {
    fn from(err: CircuitOpenError) -> Self {
        BreakerError::CircuitOpen {
            key: err.key,
            next_retry_time_ms: err.next_retry_time_ms,
        }
    }
}
