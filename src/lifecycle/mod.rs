//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Metrics → Registry → Background tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Notify tasks → Wait for loops to exit → Report final metrics
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then observability, then breakers
//! - Breaker state is in-process only; nothing is persisted across restarts

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
