//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, bounds > 0, recovery >= 0)
//! - Check that URLs and socket addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted, after environment overrides

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::{BreakerConfig, GuardConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("breakers.{breaker}.failure_threshold must be at least 1")]
    ZeroFailureThreshold { breaker: &'static str },

    #[error("breakers.{breaker}.recovery_timeout_secs must be a non-negative number, got {value}")]
    InvalidRecoveryTimeout { breaker: &'static str, value: f64 },

    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidTimeout { field: &'static str, value: f64 },

    #[error("{field} is too large to represent as a duration, got {value}")]
    DurationOutOfRange { field: &'static str, value: f64 },

    #[error("{field} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("probe.paths must not be empty")]
    EmptyProbePaths,

    #[error("probe path '{0}' must start with '/'")]
    InvalidProbePath(String),

    #[error("model.model must not be empty")]
    EmptyModelName,

    #[error("observability.metrics_address is not a socket address: {0}")]
    InvalidMetricsAddress(String),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_breaker(
        "probe",
        "breakers.probe.recovery_timeout_secs",
        &config.breakers.probe,
        &mut errors,
    );
    check_breaker(
        "model",
        "breakers.model.recovery_timeout_secs",
        &config.breakers.model,
        &mut errors,
    );

    check_positive("timeouts.probe_secs", config.timeouts.probe_secs, &mut errors);
    check_positive("timeouts.model_secs", config.timeouts.model_secs, &mut errors);
    check_positive("probe.request_timeout_secs", config.probe.request_timeout_secs, &mut errors);

    check_url("probe.host", &config.probe.base_url(), &mut errors);
    if config.probe.paths.is_empty() {
        errors.push(ValidationError::EmptyProbePaths);
    }
    for path in &config.probe.paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidProbePath(path.clone()));
        }
    }

    if let Some(base_url) = &config.model.base_url {
        check_url("model.base_url", base_url, &mut errors);
    }
    check_url("model.fallback_url", &config.model.fallback_url, &mut errors);
    if config.model.model.trim().is_empty() {
        errors.push(ValidationError::EmptyModelName);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(observability.metrics_address.clone()));
    }
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(
    name: &'static str,
    recovery_field: &'static str,
    breaker: &BreakerConfig,
    errors: &mut Vec<ValidationError>,
) {
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold { breaker: name });
    }
    let recovery = breaker.recovery_timeout_secs;
    if !recovery.is_finite() || recovery < 0.0 {
        errors.push(ValidationError::InvalidRecoveryTimeout {
            breaker: name,
            value: recovery,
        });
    } else {
        check_representable(recovery_field, recovery, errors);
    }
}

fn check_positive(field: &'static str, value: f64, errors: &mut Vec<ValidationError>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ValidationError::InvalidTimeout { field, value });
    } else {
        check_representable(field, value, errors);
    }
}

fn check_representable(field: &'static str, value: f64, errors: &mut Vec<ValidationError>) {
    if Duration::try_from_secs_f64(value).is_err() {
        errors.push(ValidationError::DurationOutOfRange { field, value });
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = GuardConfig::default();
        config.breakers.model.failure_threshold = 0;
        config.breakers.probe.recovery_timeout_secs = -5.0;
        config.timeouts.model_secs = 0.0;
        config.probe.paths = vec!["v1/models".to_string()];
        config.model.base_url = Some("localhost:11434".to_string());
        config.model.model = "  ".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors.contains(&ValidationError::ZeroFailureThreshold { breaker: "model" }));
        assert!(errors.contains(&ValidationError::InvalidRecoveryTimeout {
            breaker: "probe",
            value: -5.0
        }));
        assert!(errors.contains(&ValidationError::InvalidTimeout {
            field: "timeouts.model_secs",
            value: 0.0
        }));
        assert!(errors.contains(&ValidationError::InvalidProbePath("v1/models".to_string())));
        assert!(errors.contains(&ValidationError::EmptyModelName));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUrl { field: "model.base_url", .. })));
    }

    #[test]
    fn test_zero_recovery_timeout_is_allowed() {
        let mut config = GuardConfig::default();
        config.breakers.probe.recovery_timeout_secs = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let mut config = GuardConfig::default();
        config.breakers.model.recovery_timeout_secs = 1e20;
        config.timeouts.probe_secs = 1e20;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DurationOutOfRange {
                    field: "breakers.model.recovery_timeout_secs",
                    value: 1e20
                },
                ValidationError::DurationOutOfRange {
                    field: "timeouts.probe_secs",
                    value: 1e20
                },
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = GuardConfig::default();
        config.observability.metrics_address = "not-an-address".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidMetricsAddress("not-an-address".to_string())]
        );
    }
}
