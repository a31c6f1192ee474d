//! Configuration validation.
//!
//! Semantic checks after serde has handled the syntactic ones. Returns all
//! validation errors, not just the first.

use crate::config::schema::{AuthProviderKind, GatewayConfig};

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tenants.default_slug must not be empty")]
    EmptyDefaultSlug,

    #[error("tenants.default_slug must be lowercase: {0}")]
    DefaultSlugNotLowercase(String),

    #[error("locales.default_locale '{0}' is not in locales.supported")]
    DefaultLocaleUnsupported(String),

    #[error("locales.supported must not be empty")]
    NoSupportedLocales,

    #[error("cors origin is not an absolute http(s) URL: {0}")]
    InvalidCorsOrigin(String),

    #[error("abuse.refill_rate must be greater than zero")]
    ZeroRefillRate,

    #[error("abuse.capacity must be greater than zero")]
    ZeroCapacity,

    #[error("auth provider 'test' must not be used in production")]
    TestProviderInProduction,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let slug = &config.tenants.default_slug;
    if slug.is_empty() {
        errors.push(ValidationError::EmptyDefaultSlug);
    } else if slug.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(ValidationError::DefaultSlugNotLowercase(slug.clone()));
    }

    if config.locales.supported.is_empty() {
        errors.push(ValidationError::NoSupportedLocales);
    } else if !config
        .locales
        .supported
        .contains(&config.locales.default_locale)
    {
        errors.push(ValidationError::DefaultLocaleUnsupported(
            config.locales.default_locale.clone(),
        ));
    }

    for origin in config.cors.allowlist() {
        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            errors.push(ValidationError::InvalidCorsOrigin(origin));
        }
    }

    if config.abuse.refill_rate == 0 {
        errors.push(ValidationError::ZeroRefillRate);
    }
    if config.abuse.capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }

    if config.environment.is_production() && config.auth.provider == AuthProviderKind::Test {
        errors.push(ValidationError::TestProviderInProduction);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
