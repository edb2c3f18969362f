//! Breaker data model shared by the state machine, registry and observers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export BreakerConfig from config module to avoid duplication
pub use crate::config::schema::BreakerConfig;

/// Service label used when a caller supplies a blank one.
pub const DEFAULT_SERVICE_NAME: &str = "ai-worker";

/// Endpoint label used when a caller supplies a blank one.
pub const DEFAULT_ENDPOINT: &str = "default";

/// Opaque key-value context attached to manual trips and resets.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    /// Gauge value exported for dashboards (0 closed, 1 half-open, 2 open).
    pub fn as_gauge(self) -> f64 {
        self as u8 as f64
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// Identity of the remote AI worker endpoint a breaker protects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerKey {
    pub service_name: String,
    pub endpoint: String,
}

impl BreakerKey {
    /// Build a key, substituting the default labels for blank input.
    pub fn new(service_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service_name: label_or(service_name.into(), DEFAULT_SERVICE_NAME),
            endpoint: label_or(endpoint.into(), DEFAULT_ENDPOINT),
        }
    }
}

fn label_or(label: String, fallback: &str) -> String {
    match label.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    }
}

impl fmt::Display for BreakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_name, self.endpoint)
    }
}

/// How a protected call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Failure,
    /// Counted as a failure, reported separately.
    Timeout,
}

impl CallOutcome {
    pub fn is_failure(self) -> bool {
        !matches!(self, CallOutcome::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Timeout => "timeout",
        }
    }
}

/// Record of one protected call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub outcome: CallOutcome,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp_ms: u64,
}

impl CallResult {
    pub fn success(latency_ms: u64, timestamp_ms: u64) -> Self {
        Self {
            outcome: CallOutcome::Success,
            latency_ms,
            error: None,
            timestamp_ms,
        }
    }

    pub fn failure(latency_ms: u64, timestamp_ms: u64, error: impl Into<String>) -> Self {
        Self {
            outcome: CallOutcome::Failure,
            latency_ms,
            error: Some(error.into()),
            timestamp_ms,
        }
    }

    pub fn timeout(latency_ms: u64, timestamp_ms: u64) -> Self {
        Self {
            outcome: CallOutcome::Timeout,
            latency_ms,
            error: Some(format!("timed out after {}ms", latency_ms)),
            timestamp_ms,
        }
    }
}

/// A state change, produced by the breaker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub id: Uuid,
    pub key: BreakerKey,
    pub from: CircuitState,
    pub to: CircuitState,
    pub reason: String,
    pub metadata: Metadata,
    pub timestamp_ms: u64,
}

/// Health view derived from a breaker's state and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub key: BreakerKey,
    pub state: CircuitState,
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    /// Only set while OPEN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_time_ms: Option<u64>,
}
