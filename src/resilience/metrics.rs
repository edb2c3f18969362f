//! Per-breaker call counters.
//!
//! # Responsibilities
//! - Track consecutive and total outcomes for one breaker
//! - Remember when the last failure and last state change happened
//! - Hand out consistent point-in-time snapshots
//!
//! # Design Decisions
//! - The accumulator is plain data; its owning breaker keeps it behind the
//!   same lock that serializes state transitions, so a counter update and the
//!   transition it causes are observed together
//! - Timeouts count as failures but are totalled separately

use serde::{Deserialize, Serialize};

use crate::resilience::types::{BreakerKey, CallOutcome, CircuitState};

/// Immutable copy of a breaker's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub key: BreakerKey,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Calls that were let through and reported an outcome.
    pub total_calls: u64,
    pub total_successes: u64,
    /// Includes timeouts.
    pub total_failures: u64,
    pub total_timeouts: u64,
    /// Calls short-circuited without being invoked.
    pub total_rejected: u64,
    pub last_failure_time_ms: Option<u64>,
    pub last_state_change_ms: u64,
}

/// Mutable counters owned by exactly one breaker.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    total_calls: u64,
    total_successes: u64,
    total_failures: u64,
    total_timeouts: u64,
    total_rejected: u64,
    last_failure_time_ms: Option<u64>,
    last_state_change_ms: u64,
}

impl MetricsAccumulator {
    /// Fresh counters for a breaker created CLOSED at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_calls: 0,
            total_successes: 0,
            total_failures: 0,
            total_timeouts: 0,
            total_rejected: 0,
            last_failure_time_ms: None,
            last_state_change_ms: now_ms,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn last_state_change_ms(&self) -> u64 {
        self.last_state_change_ms
    }

    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.total_successes += 1;
        self.consecutive_failures = 0;
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
    }

    pub fn record_failure(&mut self, now_ms: u64) {
        self.total_calls += 1;
        self.total_failures += 1;
        self.consecutive_successes = 0;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_time_ms = Some(now_ms);
    }

    pub fn record_timeout(&mut self, now_ms: u64) {
        self.record_failure(now_ms);
        self.total_timeouts += 1;
    }

    /// Dispatch on an outcome.
    pub fn record(&mut self, outcome: CallOutcome, now_ms: u64) {
        match outcome {
            CallOutcome::Success => self.record_success(),
            CallOutcome::Failure => self.record_failure(now_ms),
            CallOutcome::Timeout => self.record_timeout(now_ms),
        }
    }

    /// Count an outcome that arrived after the breaker moved on.
    ///
    /// Totals change; consecutive counters do not.
    pub fn record_late(&mut self, outcome: CallOutcome, now_ms: u64) {
        self.total_calls += 1;
        match outcome {
            CallOutcome::Success => self.total_successes += 1,
            CallOutcome::Failure => {
                self.total_failures += 1;
                self.last_failure_time_ms = Some(now_ms);
            }
            CallOutcome::Timeout => {
                self.total_failures += 1;
                self.total_timeouts += 1;
                self.last_failure_time_ms = Some(now_ms);
            }
        }
    }

    pub fn record_rejected(&mut self) {
        self.total_rejected += 1;
    }

    /// Move to `state` at `now_ms`.
    ///
    /// Entering CLOSED or HALF_OPEN starts a fresh run of consecutive counts;
    /// entering OPEN keeps the failure streak that caused it.
    pub fn set_state(&mut self, state: CircuitState, now_ms: u64) {
        self.state = state;
        self.last_state_change_ms = now_ms;
        self.consecutive_successes = 0;
        if state != CircuitState::Open {
            self.consecutive_failures = 0;
        }
    }

    pub fn snapshot(&self, key: &BreakerKey) -> MetricsSnapshot {
        MetricsSnapshot {
            key: key.clone(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            total_calls: self.total_calls,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_timeouts: self.total_timeouts,
            total_rejected: self.total_rejected,
            last_failure_time_ms: self.last_failure_time_ms,
            last_state_change_ms: self.last_state_change_ms,
        }
    }
}
