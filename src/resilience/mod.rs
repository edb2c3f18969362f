//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an AI worker:
//!     → registry.rs (find or create the breaker for service + endpoint)
//!     → circuit_breaker.rs (admit, or short-circuit if open)
//!     → timeouts.rs (optional deadline on the call)
//!     → metrics.rs (record the outcome under the breaker lock)
//!     → state transition, if the outcome warrants one
//!     → events.rs (publish call result / transition to subscribers)
//!
//! Layered above, when the caller wants it:
//!     → retries.rs + backoff.rs (retry failures, never retry a rejection)
//! ```
//!
//! # Design Decisions
//! - Consecutive-failure counting, not windowed failure rates
//! - Per-endpoint circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Time comes from an injected `Clock`, so cool-downs are testable

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod events;
pub mod metrics;
pub mod registry;
pub mod retries;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::{CallPermit, CircuitBreaker};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerError, CircuitOpenError};
pub use events::{BreakerEvent, EventEmitter};
pub use metrics::{MetricsAccumulator, MetricsSnapshot};
pub use registry::BreakerRegistry;
pub use types::{
    BreakerConfig, BreakerKey, CallOutcome, CallResult, CircuitState, HealthCheckResult, Metadata,
    StateTransition,
};
