//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ratios within 0..=1)
//! - Validate bind addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    Ratio { field: &'static str, value: f64 },
    #[error("{field} is not a valid socket address: {value}")]
    Address { field: &'static str, value: String },
    #[error("monitor.window_secs ({window_ms} ms) is shorter than monitor.sampling_interval_ms ({interval_ms} ms)")]
    WindowShorterThanInterval { window_ms: u64, interval_ms: u64 },
}

fn non_zero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

fn ratio(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError::Ratio { field, value });
    }
}

fn address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

/// Check every semantic constraint, collecting all violations.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let monitor = &config.monitor;
    non_zero(&mut errors, "monitor.sampling_interval_ms", monitor.sampling_interval_ms);
    non_zero(&mut errors, "monitor.window_secs", monitor.window_secs);
    non_zero(&mut errors, "monitor.injection_interval_ms", monitor.injection_interval_ms);
    non_zero(&mut errors, "monitor.alert_threshold", monitor.alert_threshold as u64);
    if monitor.window_secs > 0 && monitor.sampling_interval_ms > 0 {
        let window_ms = monitor.window_secs.saturating_mul(1_000);
        if window_ms < monitor.sampling_interval_ms {
            errors.push(ValidationError::WindowShorterThanInterval {
                window_ms,
                interval_ms: monitor.sampling_interval_ms,
            });
        }
    }

    non_zero(&mut errors, "tracer.capacity", config.tracer.capacity as u64);
    non_zero(&mut errors, "tracer.queue_capacity", config.tracer.queue_capacity as u64);

    let policy = &config.policy;
    ratio(&mut errors, "policy.throughput_min_ratio", policy.throughput_min_ratio);
    ratio(&mut errors, "policy.tracer_min_success_ratio", policy.tracer_min_success_ratio);
    non_zero(&mut errors, "policy.exception_limit", policy.exception_limit);

    if config.observability.metrics_enabled {
        address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        }
    }

    let sim = &config.simulation;
    if sim.enabled {
        ratio(&mut errors, "simulation.drain_probability", sim.drain_probability);
        ratio(&mut errors, "simulation.read_exception_probability", sim.read_exception_probability);
        ratio(&mut errors, "simulation.write_exception_probability", sim.write_exception_probability);
        ratio(&mut errors, "simulation.connect_exception_probability", sim.connect_exception_probability);
        non_zero(&mut errors, "simulation.packets_per_sec", sim.packets_per_sec as u64);
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

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.monitor.alert_threshold = 0;
        config.tracer.capacity = 0;
        config.policy.tracer_min_success_ratio = -0.1;
        config.admin.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "monitor.alert_threshold" }));
        assert!(errors.contains(&ValidationError::Zero { field: "tracer.capacity" }));
    }

    #[test]
    fn test_window_must_cover_interval() {
        let mut config = AppConfig::default();
        config.monitor.window_secs = 1;
        config.monitor.sampling_interval_ms = 2_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::WindowShorterThanInterval { window_ms: 1_000, interval_ms: 2_000 }]
        );
    }

    #[test]
    fn test_disabled_sections_are_not_checked() {
        let mut config = AppConfig::default();
        config.admin.enabled = false;
        config.admin.bind_address = "nope".into();
        config.simulation.enabled = false;
        config.simulation.drain_probability = 7.0;
        assert!(validate_config(&config).is_ok());
    }
}
