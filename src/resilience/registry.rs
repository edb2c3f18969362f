//! Breaker registry.
//!
//! # Responsibilities
//! - Own exactly one breaker per (service, endpoint) pair
//! - Create breakers lazily, with explicit, overridden, or default tunables
//! - Provide bulk snapshots for status reporting
//!
//! # Design Decisions
//! - An explicit object owned by the application, passed by `Arc`, not a global
//! - Creation happens under the map entry lock, so racing callers get the same breaker
//! - Tunables are fixed at creation; later `get_or_create` configs are ignored
//! - All breakers publish on one shared event channel

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::schema::{resolve_breaker_config, AppConfig, BreakerOverride};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::events::{BreakerEvent, EventEmitter};
use crate::resilience::metrics::MetricsSnapshot;
use crate::resilience::types::{BreakerConfig, BreakerKey, HealthCheckResult};

/// Owner of every breaker in the process.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<BreakerKey, Arc<CircuitBreaker>>,
    defaults: BreakerConfig,
    overrides: Vec<BreakerOverride>,
    clock: Arc<dyn Clock>,
    events: EventEmitter,
}

impl BreakerRegistry {
    /// Create an empty registry with default tunables.
    pub fn new(defaults: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            defaults,
            overrides: Vec::new(),
            clock: Arc::new(SystemClock::new()),
            events: EventEmitter::default(),
        }
    }

    /// Create a registry from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.breaker.clone())
            .with_overrides(config.overrides.clone())
            .with_events(EventEmitter::new(config.events.capacity))
    }

    pub fn with_overrides(mut self, overrides: Vec<BreakerOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Receive events from every breaker in the registry.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Tunables a new breaker for `key` would get without an explicit config.
    pub fn config_for(&self, key: &BreakerKey) -> BreakerConfig {
        resolve_breaker_config(&self.defaults, &self.overrides, key)
    }

    /// The breaker for `(service_name, endpoint)`, created on first use.
    ///
    /// `config` only matters for the call that creates the breaker.
    pub fn get_or_create(
        &self,
        service_name: &str,
        endpoint: &str,
        config: Option<BreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        let key = BreakerKey::new(service_name, endpoint);
        if let Some(existing) = self.breakers.get(&key) {
            return existing.value().clone();
        }

        let new_key = key.clone();
        self.breakers
            .entry(key)
            .or_insert_with(|| {
                let key = new_key;
                let config = config.unwrap_or_else(|| self.config_for(&key));
                tracing::info!(
                    breaker = %key,
                    failure_threshold = config.failure_threshold,
                    reset_timeout_ms = config.reset_timeout_ms,
                    "Circuit breaker created"
                );
                Arc::new(CircuitBreaker::with_parts(
                    key,
                    config,
                    self.clock.clone(),
                    self.events.clone(),
                ))
            })
            .value()
            .clone()
    }

    pub fn get(&self, service_name: &str, endpoint: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .get(&BreakerKey::new(service_name, endpoint))
            .map(|entry| entry.value().clone())
    }

    /// Forget a breaker. Holders of its `Arc` keep a working, detached breaker.
    pub fn remove(&self, service_name: &str, endpoint: &str) -> Option<Arc<CircuitBreaker>> {
        let removed = self
            .breakers
            .remove(&BreakerKey::new(service_name, endpoint))
            .map(|(_, breaker)| breaker);
        if let Some(breaker) = &removed {
            tracing::info!(breaker = %breaker.key(), "Circuit breaker removed");
        }
        removed
    }

    /// Metrics of every breaker, ordered by key.
    pub fn list_all(&self) -> Vec<MetricsSnapshot> {
        let mut all: Vec<_> = self.all_breakers().iter().map(|b| b.get_metrics()).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Health of every breaker, ordered by key.
    pub fn health_all(&self) -> Vec<HealthCheckResult> {
        let mut all: Vec<_> = self
            .all_breakers()
            .iter()
            .map(|b| b.get_health_check())
            .collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Manually reset every breaker.
    pub fn reset_all(&self, reason: &str) {
        for breaker in self.all_breakers() {
            breaker.reset(reason);
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Clone the handles out so no map shard stays locked while breakers are used.
    fn all_breakers(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use crate::resilience::types::{CircuitState, Metadata};

    fn registry() -> BreakerRegistry {
        BreakerRegistry::new(BreakerConfig::new(3, 5_000)).with_clock(Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = registry();
        let first = registry.get_or_create("ai-worker", "/asr", Some(BreakerConfig::new(1, 10)));
        let second = registry.get_or_create("ai-worker", "/asr", Some(BreakerConfig::new(9, 99)));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().failure_threshold, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_breakers() {
        let registry = registry();
        let asr = registry.get_or_create("ai-worker", "/asr", None);
        let moderation = registry.get_or_create("ai-worker", "/moderation", None);

        asr.trip("test", Metadata::new());
        assert_eq!(moderation.state(), CircuitState::Closed);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_overrides_apply_when_no_config_given() {
        let registry = registry().with_overrides(vec![BreakerOverride {
            service_name: "ai-worker".into(),
            endpoint: Some("/asr".into()),
            failure_threshold: Some(1),
            ..Default::default()
        }]);

        let asr = registry.get_or_create("ai-worker", "/asr", None);
        let moderation = registry.get_or_create("ai-worker", "/moderation", None);
        assert_eq!(asr.config().failure_threshold, 1);
        assert_eq!(moderation.config().failure_threshold, 3);
    }

    #[test]
    fn test_blank_labels_share_the_default_breaker() {
        let registry = registry();
        let a = registry.get_or_create("", "", None);
        let b = registry.get_or_create("ai-worker", "default", None);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_list_all_is_sorted_snapshot() {
        let registry = registry();
        registry.get_or_create("ai-worker", "/moderation", None);
        registry.get_or_create("ai-worker", "/asr", None);
        registry.get_or_create("gateway", "/asr", None);

        let endpoints: Vec<_> = registry
            .list_all()
            .into_iter()
            .map(|m| format!("{}", m.key))
            .collect();
        assert_eq!(endpoints, vec!["ai-worker//asr", "ai-worker//moderation", "gateway//asr"]);
    }

    #[test]
    fn test_remove_and_reset_all() {
        let registry = registry();
        let asr = registry.get_or_create("ai-worker", "/asr", None);
        let moderation = registry.get_or_create("ai-worker", "/moderation", None);
        asr.trip("a", Metadata::new());
        moderation.trip("b", Metadata::new());

        registry.reset_all("maintenance over");
        assert!(registry
            .health_all()
            .iter()
            .all(|h| h.state == CircuitState::Closed && h.is_healthy));

        assert!(registry.remove("ai-worker", "/asr").is_some());
        assert!(registry.get("ai-worker", "/asr").is_none());
        assert!(registry.remove("ai-worker", "/asr").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_events_from_all_breakers_share_one_channel() {
        let registry = registry();
        let mut rx = registry.subscribe();

        registry.get_or_create("ai-worker", "/asr", None).trip("a", Metadata::new());
        registry.get_or_create("ai-worker", "/moderation", None).trip("b", Metadata::new());

        assert_eq!(rx.recv().await.unwrap().key().endpoint, "/asr");
        assert_eq!(rx.recv().await.unwrap().key().endpoint, "/moderation");
    }
}
