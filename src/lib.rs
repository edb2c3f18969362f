//! Circuit breakers for calls to remote AI worker services.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::AppConfig;
pub use lifecycle::Shutdown;
pub use resilience::{
    BreakerConfig, BreakerError, BreakerEvent, BreakerKey, BreakerRegistry, CircuitBreaker,
    CircuitState, HealthCheckResult, MetricsSnapshot,
};
