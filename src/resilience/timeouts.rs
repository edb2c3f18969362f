//! Timeout enforcement for protected calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the call future is dropped on expiry
//! - A timeout counts as a failure but is recorded with its own outcome tag
//! - Timeout errors are distinct from the call's own errors

use std::future::Future;
use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::BreakerError;

impl CircuitBreaker {
    /// Like [`CircuitBreaker::execute`], with a deadline on the call.
    ///
    /// If `deadline` expires first the call is cancelled, recorded as a
    /// timeout, and [`BreakerError::Timeout`] is returned.
    pub async fn execute_with_timeout<F, Fut, T, E>(
        &self,
        deadline: Duration,
        call: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let permit = self.try_acquire()?;
        match tokio::time::timeout(deadline, call()).await {
            Ok(Ok(value)) => {
                permit.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                permit.record_failure(e.to_string());
                Err(BreakerError::Call(e))
            }
            Err(_) => {
                permit.record_timeout();
                Err(BreakerError::Timeout {
                    key: self.key().clone(),
                    after_ms: deadline.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::types::{BreakerConfig, BreakerKey, CircuitState};

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            BreakerKey::new("ai-worker", "/asr"),
            BreakerConfig::new(threshold, 60_000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_is_recorded_as_timeout() {
        let b = breaker(2);

        let err = b
            .execute_with_timeout(Duration::from_millis(50), || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BreakerError::Timeout { after_ms: 50, .. }));
        let snap = b.get_metrics();
        assert_eq!(snap.total_timeouts, 1);
        assert_eq!(snap.consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_trip_like_failures() {
        let b = breaker(2);
        for _ in 0..2 {
            let _ = b
                .execute_with_timeout(Duration::from_millis(5), || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<_, String>(())
                })
                .await;
        }
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let b = breaker(2);
        let value = b
            .execute_with_timeout(Duration::from_secs(1), || async { Ok::<_, String>("ok") })
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(b.get_metrics().total_successes, 1);
    }
}
