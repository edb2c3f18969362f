//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → breaker tunables resolved per (service, endpoint) at breaker creation
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a breaker keeps the tunables it was created with
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::BreakerConfig;
pub use schema::BreakerOverride;
pub use schema::WorkerConfig;
