//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (active.rs):
//!     Periodic timer
//!     → GET <worker base_url><probe path> through the worker's breaker
//!     → breaker counters and state updated like any other call
//!
//! Passive signal:
//!     every protected call made by the application feeds the same breaker
//! ```
//!
//! # Design Decisions
//! - Active and passive signals are complementary and share one state machine
//! - Health is per (service, endpoint), read from `CircuitBreaker::get_health_check`

pub mod active;
