//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::TracerStage;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = parse_config(
            r#"
            [monitor]
            alert_threshold = 3

            [policy]
            exception_limit = 50

            [tracer]
            completion_stage = "WRITTEN_TO_DEVICE"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.alert_threshold, 3);
        assert_eq!(config.monitor.sampling_interval_ms, 1_000);
        assert_eq!(config.policy.exception_limit, 50);
        assert_eq!(config.policy.throughput_warmup_inputs, 100);
        assert_eq!(config.tracer.completion_stage, Some(TracerStage::WrittenToDevice));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = parse_config(
            r#"
            [monitor]
            sampling_interval_ms = 0

            [policy]
            throughput_min_ratio = 1.5
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(parse_config("[monitor"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/tunnel-health.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
