//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the breaker
//! daemon. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::types::BreakerKey;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Default tunables for every breaker.
    pub breaker: BreakerConfig,

    /// Per-service (and optionally per-endpoint) tunables.
    pub overrides: Vec<BreakerOverride>,

    /// Active probing of remote AI workers.
    pub probe: ProbeConfig,

    /// Remote AI worker endpoints to protect.
    pub workers: Vec<WorkerConfig>,

    /// Retry policy layered above breakers by callers such as the probe monitor.
    pub retries: RetryConfig,

    /// Event fan-out settings.
    pub events: EventsConfig,
}

impl AppConfig {
    /// Effective breaker tunables for a key.
    ///
    /// An override naming both service and endpoint wins over one naming only
    /// the service; fields the override leaves unset come from `breaker`.
    pub fn breaker_for(&self, key: &BreakerKey) -> BreakerConfig {
        resolve_breaker_config(&self.breaker, &self.overrides, key)
    }
}

/// Resolve the tunables for `key` from defaults plus overrides.
pub fn resolve_breaker_config(
    defaults: &BreakerConfig,
    overrides: &[BreakerOverride],
    key: &BreakerKey,
) -> BreakerConfig {
    overrides
        .iter()
        .filter_map(|o| o.specificity(key).map(|s| (s, o)))
        .max_by_key(|(s, _)| *s)
        .map(|(_, o)| o.apply(defaults))
        .unwrap_or_else(|| defaults.clone())
}

/// Circuit breaker tunables. Fixed once a breaker is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that trip a closed breaker.
    #[serde(alias = "failureThreshold")]
    pub failure_threshold: u32,

    /// Cool-down in milliseconds before an open breaker lets a probe through.
    #[serde(alias = "resetTimeoutMs")]
    pub reset_timeout_ms: u64,

    /// Consecutive probe successes needed to close from half-open.
    #[serde(alias = "successThreshold")]
    pub success_threshold: u32,

    /// Probe calls allowed in flight while half-open.
    #[serde(alias = "halfOpenMaxCalls")]
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            success_threshold: 1,
            half_open_max_calls: 1,
        }
    }
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, reset_timeout_ms: u64) -> Self {
        Self {
            failure_threshold,
            reset_timeout_ms,
            ..Self::default()
        }
    }

    pub fn with_success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    pub fn with_half_open_max_calls(mut self, half_open_max_calls: u32) -> Self {
        self.half_open_max_calls = half_open_max_calls;
        self
    }
}

/// Tunables for one service, or one service endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BreakerOverride {
    pub service_name: String,

    /// When unset the override applies to every endpoint of the service.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub reset_timeout_ms: Option<u64>,
    #[serde(default)]
    pub success_threshold: Option<u32>,
    #[serde(default)]
    pub half_open_max_calls: Option<u32>,
}

impl BreakerOverride {
    /// `None` if the override does not apply, otherwise how specific it is.
    fn specificity(&self, key: &BreakerKey) -> Option<u8> {
        let target = BreakerKey::new(
            self.service_name.as_str(),
            self.endpoint.as_deref().unwrap_or_default(),
        );
        if target.service_name != key.service_name {
            return None;
        }
        match &self.endpoint {
            None => Some(1),
            Some(_) if target.endpoint == key.endpoint => Some(2),
            Some(_) => None,
        }
    }

    fn apply(&self, base: &BreakerConfig) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            reset_timeout_ms: self.reset_timeout_ms.unwrap_or(base.reset_timeout_ms),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            half_open_max_calls: self.half_open_max_calls.unwrap_or(base.half_open_max_calls),
        }
    }
}

/// Active probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Enable active probes.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe deadline in milliseconds.
    pub timeout_ms: u64,

    /// Path appended to each worker's base URL.
    pub path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_ms: 2_000,
            path: "/healthz".to_string(),
        }
    }
}

/// A remote AI worker endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Service label (e.g., "ai-worker").
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Endpoint label (e.g., "/asr" or "/moderation").
    pub endpoint: String,

    /// Base URL of the worker (e.g., "http://127.0.0.1:8001").
    pub base_url: String,
}

fn default_service_name() -> String {
    crate::resilience::types::DEFAULT_SERVICE_NAME.to_string()
}

impl WorkerConfig {
    pub fn key(&self) -> BreakerKey {
        BreakerKey::new(self.service_name.clone(), self.endpoint.clone())
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Event fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Buffered events per subscriber before the slowest one starts lagging.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}
