//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, intervals > 0)
//! - Detect duplicate worker keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, BreakerConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroThreshold { field: String },

    #[error("{field} must be greater than 0")]
    ZeroInterval { field: String },

    #[error("override #{index} has an empty service_name")]
    EmptyOverrideService { index: usize },

    #[error("worker #{index} has an invalid base_url '{url}'")]
    InvalidWorkerUrl { index: usize, url: String },

    #[error("worker {key} is declared more than once")]
    DuplicateWorker { key: String },

    #[error("probe path '{0}' must start with '/'")]
    InvalidProbePath(String),

    #[error("metrics address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("events capacity must be at least 1")]
    ZeroEventCapacity,
}

/// Check the value ranges of breaker tunables.
pub fn validate_breaker(config: &BreakerConfig, scope: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{}.failure_threshold", scope),
        });
    }
    if config.success_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{}.success_threshold", scope),
        });
    }
    if config.half_open_max_calls == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{}.half_open_max_calls", scope),
        });
    }
    errors
}

/// Validate a whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_breaker(&config.breaker, "breaker");

    for (index, o) in config.overrides.iter().enumerate() {
        if o.service_name.trim().is_empty() {
            errors.push(ValidationError::EmptyOverrideService { index });
        }
        let checks = [
            ("failure_threshold", o.failure_threshold),
            ("success_threshold", o.success_threshold),
            ("half_open_max_calls", o.half_open_max_calls),
        ];
        for (name, value) in checks {
            if value == Some(0) {
                errors.push(ValidationError::ZeroThreshold {
                    field: format!("overrides[{}].{}", index, name),
                });
            }
        }
    }

    if config.probe.enabled {
        if config.probe.interval_secs == 0 {
            errors.push(ValidationError::ZeroInterval {
                field: "probe.interval_secs".to_string(),
            });
        }
        if config.probe.timeout_ms == 0 {
            errors.push(ValidationError::ZeroInterval {
                field: "probe.timeout_ms".to_string(),
            });
        }
        if !config.probe.path.starts_with('/') {
            errors.push(ValidationError::InvalidProbePath(config.probe.path.clone()));
        }
    }

    let mut seen = HashSet::new();
    for (index, worker) in config.workers.iter().enumerate() {
        if reqwest::Url::parse(&worker.base_url).is_err() {
            errors.push(ValidationError::InvalidWorkerUrl {
                index,
                url: worker.base_url.clone(),
            });
        }
        let key = worker.key();
        if !seen.insert(key.clone()) {
            errors.push(ValidationError::DuplicateWorker {
                key: key.to_string(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: "retries.max_attempts".to_string(),
        });
    }

    if config.events.capacity == 0 {
        errors.push(ValidationError::ZeroEventCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BreakerOverride, WorkerConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = AppConfig::default();
        config.breaker.failure_threshold = 0;
        config.probe.interval_secs = 0;
        config.overrides.push(BreakerOverride {
            service_name: " ".into(),
            success_threshold: Some(0),
            ..Default::default()
        });
        let worker = WorkerConfig {
            service_name: "ai-worker".into(),
            endpoint: "/asr".into(),
            base_url: "not a url".into(),
        };
        config.workers.push(worker.clone());
        config.workers.push(worker);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroThreshold {
            field: "breaker.failure_threshold".into()
        }));
        assert!(errors.contains(&ValidationError::ZeroInterval {
            field: "probe.interval_secs".into()
        }));
        assert!(errors.contains(&ValidationError::EmptyOverrideService { index: 0 }));
        assert!(errors.contains(&ValidationError::ZeroThreshold {
            field: "overrides[0].success_threshold".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateWorker {
            key: "ai-worker//asr".into()
        }));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidWorkerUrl { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "localhost".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidMetricsAddress("localhost".into())]
        );
    }

    #[test]
    fn test_zero_reset_timeout_is_allowed() {
        let mut config = AppConfig::default();
        config.breaker.reset_timeout_ms = 0;
        assert!(validate_config(&config).is_ok());
    }
}
