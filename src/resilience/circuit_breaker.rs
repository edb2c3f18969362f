//! Circuit breaker protecting calls to one remote AI worker endpoint.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: worker assumed down, calls fail fast
//! - Half-Open: testing if the worker recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call attempt after reset_timeout_ms
//! Half-Open → Closed: success_threshold consecutive probe successes
//! Half-Open → Open: any probe failure
//! any → Open / Closed: manual trip / reset
//! ```
//!
//! # Design Decisions
//! - Open → Half-Open is evaluated lazily on the next call, never by a timer
//! - The lock covers admission and bookkeeping only, never the call itself
//! - Half-Open admits at most `half_open_max_calls` probes; everyone else is
//!   short-circuited as if Open
//! - Every admission is tagged with the state generation it was granted in;
//!   outcomes from an older generation update totals but cannot move state

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use uuid::Uuid;

use crate::observability::metrics as obs;
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::{BreakerError, CircuitOpenError};
use crate::resilience::events::{BreakerEvent, EventEmitter};
use crate::resilience::metrics::{MetricsAccumulator, MetricsSnapshot};
use crate::resilience::types::{
    BreakerConfig, BreakerKey, CallResult, CircuitState, HealthCheckResult, Metadata, StateTransition,
};

pub const REASON_THRESHOLD_EXCEEDED: &str = "failure threshold exceeded";
pub const REASON_PROBE_FAILED: &str = "probe failed";
pub const REASON_PROBE_SUCCEEDED: &str = "probe succeeded";
pub const REASON_COOL_DOWN_ELAPSED: &str = "reset timeout elapsed";

/// Breaker-wide mutable state. Only touched under `CircuitBreaker::inner`.
#[derive(Debug)]
struct BreakerInner {
    metrics: MetricsAccumulator,
    /// Bumped on every transition.
    generation: u64,
    probes_in_flight: u32,
}

/// State machine guarding calls to a single (service, endpoint) pair.
#[derive(Debug)]
pub struct CircuitBreaker {
    key: BreakerKey,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    events: EventEmitter,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker using the system clock and a private event channel.
    pub fn new(key: BreakerKey, config: BreakerConfig) -> Self {
        Self::with_parts(key, config, Arc::new(SystemClock::new()), EventEmitter::default())
    }

    /// Create a breaker with an explicit clock and event emitter.
    ///
    /// Thresholds below 1 are raised to 1.
    pub fn with_parts(
        key: BreakerKey,
        mut config: BreakerConfig,
        clock: Arc<dyn Clock>,
        events: EventEmitter,
    ) -> Self {
        config.failure_threshold = config.failure_threshold.max(1);
        config.success_threshold = config.success_threshold.max(1);
        config.half_open_max_calls = config.half_open_max_calls.max(1);

        let now = clock.now_ms();
        obs::record_state(&key, CircuitState::Closed);
        Self {
            key,
            config,
            clock,
            events,
            inner: Mutex::new(BreakerInner {
                metrics: MetricsAccumulator::new(now),
                generation: 0,
                probes_in_flight: 0,
            }),
        }
    }

    pub fn key(&self) -> &BreakerKey {
        &self.key
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state, without evaluating the cool-down.
    pub fn state(&self) -> CircuitState {
        self.lock().metrics.state()
    }

    /// Subscribe to this breaker's event channel.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_retry_time_ms(&self, inner: &BreakerInner) -> u64 {
        inner
            .metrics
            .last_state_change_ms()
            .saturating_add(self.config.reset_timeout_ms)
    }

    /// Run `call` through the breaker.
    ///
    /// Returns the call's value, the call's own error wrapped in
    /// [`BreakerError::Call`], or [`BreakerError::CircuitOpen`] without having
    /// invoked `call` at all.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let permit = self.try_acquire()?;
        match call().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure(e.to_string());
                Err(BreakerError::Call(e))
            }
        }
    }

    /// Ask to make one call.
    ///
    /// On success the caller must report the outcome through the returned
    /// permit. Dropping the permit without reporting abandons the call.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, CircuitOpenError> {
        let mut inner = self.lock();
        let now = self.clock.now_ms();

        if inner.metrics.state() == CircuitState::Open {
            let next_retry = self.next_retry_time_ms(&inner);
            if now < next_retry {
                return Err(self.reject(&mut inner, next_retry));
            }
            self.transition(
                &mut inner,
                CircuitState::HalfOpen,
                REASON_COOL_DOWN_ELAPSED.to_string(),
                Metadata::new(),
                now,
            );
        }

        let probe = match inner.metrics.state() {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => {
                if inner.probes_in_flight >= self.config.half_open_max_calls {
                    // Probe pending; retry once it resolves.
                    return Err(self.reject(&mut inner, now));
                }
                inner.probes_in_flight += 1;
                tracing::debug!(breaker = %self.key, "Admitting half-open probe");
                true
            }
            CircuitState::Open => {
                let next_retry = self.next_retry_time_ms(&inner);
                return Err(self.reject(&mut inner, next_retry));
            }
        };

        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            probe,
            started: Instant::now(),
            completed: false,
        })
    }

    fn reject(&self, inner: &mut BreakerInner, next_retry_time_ms: u64) -> CircuitOpenError {
        inner.metrics.record_rejected();
        obs::record_rejection(&self.key);
        tracing::debug!(
            breaker = %self.key,
            next_retry_time_ms,
            "Call short-circuited"
        );
        CircuitOpenError {
            key: self.key.clone(),
            next_retry_time_ms,
        }
    }

    fn complete(&self, generation: u64, probe: bool, result: CallResult) {
        let mut inner = self.lock();
        let now = result.timestamp_ms;
        let outcome = result.outcome;

        obs::record_call(&self.key, outcome, result.latency_ms);
        self.events.emit(BreakerEvent::CallRecorded {
            key: self.key.clone(),
            result: result.clone(),
        });

        if generation != inner.generation {
            inner.metrics.record_late(outcome, now);
            tracing::trace!(breaker = %self.key, outcome = outcome.as_str(), "Late outcome ignored for state");
            return;
        }
        if probe {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
        }
        inner.metrics.record(outcome, now);

        match (inner.metrics.state(), outcome.is_failure()) {
            (CircuitState::Closed, true) => {
                let failures = inner.metrics.consecutive_failures();
                if failures >= self.config.failure_threshold {
                    let mut metadata = Metadata::new();
                    metadata.insert("consecutiveFailures".into(), failures.into());
                    metadata.insert("outcome".into(), outcome.as_str().into());
                    if let Some(error) = &result.error {
                        metadata.insert("lastError".into(), error.clone().into());
                    }
                    self.transition(
                        &mut inner,
                        CircuitState::Open,
                        REASON_THRESHOLD_EXCEEDED.to_string(),
                        metadata,
                        now,
                    );
                }
            }
            (CircuitState::HalfOpen, true) => {
                let mut metadata = Metadata::new();
                metadata.insert("outcome".into(), outcome.as_str().into());
                if let Some(error) = &result.error {
                    metadata.insert("lastError".into(), error.clone().into());
                }
                self.transition(
                    &mut inner,
                    CircuitState::Open,
                    REASON_PROBE_FAILED.to_string(),
                    metadata,
                    now,
                );
            }
            (CircuitState::HalfOpen, false) => {
                if inner.metrics.consecutive_successes() >= self.config.success_threshold {
                    self.transition(
                        &mut inner,
                        CircuitState::Closed,
                        REASON_PROBE_SUCCEEDED.to_string(),
                        Metadata::new(),
                        now,
                    );
                }
            }
            // Open never admits calls in its own generation.
            (CircuitState::Closed, false) | (CircuitState::Open, _) => {}
        }
    }

    fn abandon(&self, generation: u64, probe: bool) {
        let mut inner = self.lock();
        if probe && generation == inner.generation {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
            tracing::debug!(breaker = %self.key, "Probe abandoned, slot released");
        }
    }

    fn transition(
        &self,
        inner: &mut BreakerInner,
        to: CircuitState,
        reason: String,
        metadata: Metadata,
        now: u64,
    ) {
        let from = inner.metrics.state();
        inner.metrics.set_state(to, now);
        inner.generation += 1;
        inner.probes_in_flight = 0;

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.key,
                %from,
                reason = %reason,
                retry_after_ms = self.config.reset_timeout_ms,
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                breaker = %self.key,
                reason = %reason,
                "Circuit half-open, probing worker"
            ),
            CircuitState::Closed => tracing::info!(
                breaker = %self.key,
                %from,
                reason = %reason,
                "Circuit closed"
            ),
        }
        obs::record_transition(&self.key, to);

        self.events.emit(BreakerEvent::StateChanged(StateTransition {
            id: Uuid::new_v4(),
            key: self.key.clone(),
            from,
            to,
            reason,
            metadata,
            timestamp_ms: now,
        }));
    }

    /// Force the breaker OPEN and restart the cool-down.
    ///
    /// Repeated trips leave it OPEN; each one restarts the cool-down and is
    /// published with its own reason.
    pub fn trip(&self, reason: impl Into<String>, metadata: Metadata) {
        let mut inner = self.lock();
        let now = self.clock.now_ms();
        self.transition(&mut inner, CircuitState::Open, reason.into(), metadata, now);
    }

    /// Force the breaker CLOSED and zero its consecutive counters.
    ///
    /// Lifetime totals and the last failure time are kept.
    pub fn reset(&self, reason: impl Into<String>) {
        let mut inner = self.lock();
        let now = self.clock.now_ms();
        self.transition(&mut inner, CircuitState::Closed, reason.into(), Metadata::new(), now);
    }

    /// Point-in-time copy of the counters.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.lock().metrics.snapshot(&self.key)
    }

    /// Health view of the breaker.
    ///
    /// Healthy when CLOSED, or HALF_OPEN with no failure recorded since the
    /// probe window opened.
    pub fn get_health_check(&self) -> HealthCheckResult {
        let inner = self.lock();
        let state = inner.metrics.state();
        let consecutive_failures = inner.metrics.consecutive_failures();
        HealthCheckResult {
            key: self.key.clone(),
            state,
            is_healthy: match state {
                CircuitState::Closed => true,
                CircuitState::HalfOpen => consecutive_failures == 0,
                CircuitState::Open => false,
            },
            consecutive_failures,
            next_retry_time_ms: (state == CircuitState::Open).then(|| self.next_retry_time_ms(&inner)),
        }
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Admission to make one protected call.
///
/// Report exactly one outcome. A permit dropped without an outcome (e.g. the
/// caller's future was cancelled) frees its probe slot and records nothing.
#[must_use = "report the call outcome through the permit"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    started: Instant,
    completed: bool,
}

impl CallPermit<'_> {
    /// Whether this call is a half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    fn latency_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn record_success(self) {
        let result = CallResult::success(self.latency_ms(), self.breaker.now_ms());
        self.record(result);
    }

    pub fn record_failure(self, error: impl Into<String>) {
        let result = CallResult::failure(self.latency_ms(), self.breaker.now_ms(), error);
        self.record(result);
    }

    pub fn record_timeout(self) {
        let result = CallResult::timeout(self.latency_ms(), self.breaker.now_ms());
        self.record(result);
    }

    /// Report a result the caller measured itself.
    pub fn record(mut self, result: CallResult) {
        self.completed = true;
        self.breaker.complete(self.generation, self.probe, result);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.abandon(self.generation, self.probe);
        }
    }
}
