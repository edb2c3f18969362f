//! Active probing of remote AI workers.
//!
//! # Responsibilities
//! - Periodically GET each worker's health path
//! - Route every probe through the worker's breaker, so an unreachable worker
//!   trips it and a recovered one closes it again
//!
//! # Design Decisions
//! - Probes are ordinary protected calls: same admission, same counters
//! - A probe that the breaker short-circuits is not an error, just skipped
//! - Non-2xx responses count as failures

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::{ProbeConfig, RetryConfig, WorkerConfig};
use crate::resilience::error::BreakerError;
use crate::resilience::registry::BreakerRegistry;
use crate::resilience::retries::retry_with_backoff;
use crate::resilience::types::BreakerKey;

/// Result of probing one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy(String),
    TimedOut,
    /// The breaker refused the probe.
    ShortCircuited { next_retry_time_ms: u64 },
}

pub struct ProbeMonitor {
    registry: Arc<BreakerRegistry>,
    workers: Vec<WorkerConfig>,
    config: ProbeConfig,
    retries: RetryConfig,
    client: reqwest::Client,
}

impl ProbeMonitor {
    pub fn new(
        registry: Arc<BreakerRegistry>,
        workers: Vec<WorkerConfig>,
        config: ProbeConfig,
        retries: RetryConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("ai-worker-breaker-probe")
            .no_proxy()
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            registry,
            workers,
            config,
            retries,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled || self.workers.is_empty() {
            tracing::info!("Active probes disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            workers = self.workers.len(),
            "Probe monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Probe monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every worker once.
    pub async fn check_all(&self) -> Vec<(BreakerKey, ProbeStatus)> {
        let mut results = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let status = self.check_worker(worker).await;
            results.push((worker.key(), status));
        }
        results
    }

    async fn check_worker(&self, worker: &WorkerConfig) -> ProbeStatus {
        let breaker = self
            .registry
            .get_or_create(&worker.service_name, &worker.endpoint, None);
        let url = format!("{}{}", worker.base_url.trim_end_matches('/'), self.config.path);
        let deadline = Duration::from_millis(self.config.timeout_ms);
        let client = &self.client;

        let result = retry_with_backoff(&self.retries, || {
            breaker.execute_with_timeout(deadline, || async {
                client
                    .get(url.as_str())
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map(|_| ())
            })
        })
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(breaker = %breaker.key(), url = %url, "Probe succeeded");
                ProbeStatus::Healthy
            }
            Err(BreakerError::Call(e)) => {
                tracing::warn!(breaker = %breaker.key(), url = %url, error = %e, "Probe failed");
                ProbeStatus::Unhealthy(e.to_string())
            }
            Err(BreakerError::Timeout { after_ms, .. }) => {
                tracing::warn!(breaker = %breaker.key(), url = %url, after_ms, "Probe timed out");
                ProbeStatus::TimedOut
            }
            Err(BreakerError::CircuitOpen {
                next_retry_time_ms, ..
            }) => {
                tracing::debug!(breaker = %breaker.key(), next_retry_time_ms, "Probe skipped, circuit open");
                ProbeStatus::ShortCircuited { next_retry_time_ms }
            }
        }
    }
}
