//! Configuration loading from disk.

use std::env;
use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Secrets are overridable from the environment after the file is parsed,
/// so config files can be committed without credentials.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay secret material from environment variables.
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(key) = env::var("GATEWAY_ABUSE_API_KEY") {
        if !key.is_empty() {
            config.abuse.api_key = Some(key);
        }
    }
    if let Ok(pem) = env::var("GATEWAY_CLERK_JWT_PUBLIC_KEY") {
        if !pem.is_empty() {
            config.auth.clerk.jwt_public_key = Some(pem);
        }
    }
    if let Ok(dsn) = env::var("GATEWAY_ERROR_MONITORING_DSN") {
        if !dsn.is_empty() {
            config.security.error_monitoring_dsn = Some(dsn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.tenants.default_slug, "default");
        assert_eq!(config.locales.default_locale, "en");
        assert_eq!(config.abuse.capacity, 120);
        assert!(config.abuse.api_key.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            environment = "production"

            [tenants]
            default_slug = "acme"

            [auth]
            provider = "clerk"

            [abuse]
            interval = "5m"
            "#,
        )
        .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.tenants.default_slug, "acme");
        assert_eq!(config.abuse.interval, "5m");
    }
}
