//! Retry logic layered above a breaker.
//!
//! # Responsibilities
//! - Re-run an operation that failed, with jittered exponential backoff
//! - Stop as soon as the breaker refuses the call
//!
//! # Design Decisions
//! - Breakers never retry on their own; retrying is the caller's choice
//! - A `CircuitOpen` rejection is never retried (the breaker already said no)
//! - Every attempt goes through the breaker, so retries feed its counters

use std::future::Future;

use crate::config::schema::RetryConfig;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::error::BreakerError;

/// Run `attempt` until it succeeds, the breaker rejects it, or
/// `config.max_attempts` is used up. Returns the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    mut attempt: F,
) -> Result<T, BreakerError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BreakerError<E>>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut tried = 0;
    loop {
        tried += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_circuit_open() || tried >= max_attempts => return Err(e),
            Err(_) => {
                let delay = calculate_backoff(tried, config.base_delay_ms, config.max_delay_ms);
                tracing::debug!(attempt = tried, delay_ms = delay.as_millis() as u64, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitBreaker;
    use crate::resilience::types::{BreakerConfig, BreakerKey};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retries(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let breaker = CircuitBreaker::new(BreakerKey::new("ai-worker", "/asr"), BreakerConfig::new(5, 1_000));
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&retries(3), || {
            breaker.execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("busy".to_string())
                } else {
                    Ok("transcript")
                }
            })
        })
        .await;

        assert_eq!(result.unwrap(), "transcript");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.get_metrics().total_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let breaker = CircuitBreaker::new(BreakerKey::new("ai-worker", "/asr"), BreakerConfig::new(10, 1_000));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&retries(2), || {
            breaker.execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            })
        })
        .await;

        assert_eq!(result.unwrap_err().into_call_error().as_deref(), Some("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_stops_retrying() {
        let breaker = CircuitBreaker::new(BreakerKey::new("ai-worker", "/asr"), BreakerConfig::new(1, 60_000));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&retries(5), || {
            breaker.execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            })
        })
        .await;

        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.get_metrics().total_rejected, 1);
    }
}
