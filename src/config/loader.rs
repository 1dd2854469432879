//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, Mode};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `governor.mode`.
pub const MODE_ENV: &str = "GOVERNOR_MODE";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid GOVERNOR_MODE: {0}")]
    Mode(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate a TOML document.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, std::env::var(MODE_ENV).ok().as_deref())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the mode override, if any.
pub fn apply_env_overrides(config: &mut GatewayConfig, mode: Option<&str>) -> Result<(), ConfigError> {
    if let Some(raw) = mode {
        let mode: Mode = raw.parse().map_err(ConfigError::Mode)?;
        if mode != config.governor.mode {
            tracing::info!(from = config.governor.mode.as_str(), to = mode.as_str(), "Mode overridden by environment");
        }
        config.governor.mode = mode;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let doc = r#"
            [governor]
            mode = "production"

            [rate_limit]
            max_requests = 5

            [cors]
            canonical_origin = "https://crm.example.com"
            production_origins = ["https://crm.example.com", "https://app.crm.example.com"]
        "#;
        let mut config: GatewayConfig = toml::from_str(doc).unwrap();
        apply_env_overrides(&mut config, None).unwrap();
        validate_config(&config).unwrap();

        assert!(config.is_production());
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.governor.reserved_label, "www");
        assert_eq!(config.cors.production_origins.len(), 2);
    }

    #[test]
    fn test_env_override() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, Some("PRODUCTION")).unwrap();
        assert_eq!(config.governor.mode, Mode::Production);

        apply_env_overrides(&mut config, Some("dev")).unwrap();
        assert_eq!(config.governor.mode, Mode::Development);

        assert!(matches!(
            apply_env_overrides(&mut config, Some("staging")),
            Err(ConfigError::Mode(_))
        ));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let doc = r#"
            [rate_limit]
            window_secs = 0
        "#;
        let mut config: GatewayConfig = toml::from_str(doc).unwrap();
        apply_env_overrides(&mut config, None).unwrap();
        let err = ConfigError::Validation(validate_config(&config).unwrap_err());
        assert!(err.to_string().contains("rate_limit.window_secs"));
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        let doc = r#"
            [governor]
            mode = "staging"
        "#;
        assert!(toml::from_str::<GatewayConfig>(doc).is_err());
    }

    #[test]
    fn test_demo_config_is_valid() {
        let config: GatewayConfig = toml::from_str(include_str!("../../demos/governor.toml")).unwrap();
        validate_config(&config).unwrap();
        assert!(config.admin.enabled);
        assert_eq!(config.health_check.path, "/api/health");
    }
}
