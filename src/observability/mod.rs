//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers produce:
//!     → tracing log lines at every transition
//!     → metrics.rs (counters, gauges, histograms)
//!     → events on the registry channel → logging.rs event logger
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON optional)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (no-op without a recorder)
//! - Breaker behaviour never depends on an observer succeeding

pub mod logging;
pub mod metrics;
