//! Security response headers.
//!
//! # Responsibilities
//! - Build the per-deployment Content-Security-Policy once
//! - Stamp the fixed hardening header set onto every response
//! - HSTS in production only
//!
//! Application is idempotent: values are precomputed and inserted (not
//! appended), so applying twice yields the same headers.

use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::schema::GatewayConfig;
use crate::security::csp::build_csp;

static PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

const PERMISSIONS_POLICY_VALUE: &str =
    "camera=(), microphone=(), geolocation=(), interest-cohort=()";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains; preload";

/// Precomputed security header set.
#[derive(Clone)]
pub struct SecurityHeaders {
    csp: HeaderValue,
    hsts: bool,
}

impl SecurityHeaders {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let csp = build_csp(&config.security, &config.auth);
        Self {
            csp: HeaderValue::from_str(&csp)
                .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'")),
            hsts: config.environment.is_production(),
        }
    }

    /// Stamp the header set onto a response. Mutates only headers; always
    /// succeeds.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(CONTENT_SECURITY_POLICY, self.csp.clone());
        headers.insert(
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(
            PERMISSIONS_POLICY.clone(),
            HeaderValue::from_static(PERMISSIONS_POLICY_VALUE),
        );
        if self.hsts {
            headers.insert(
                STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(HSTS_VALUE),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;

    #[test]
    fn applies_fixed_header_set() {
        let headers_set = SecurityHeaders::from_config(&GatewayConfig::default());
        let mut headers = HeaderMap::new();
        headers_set.apply(&mut headers);

        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(
            headers.get(REFERRER_POLICY).unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert_eq!(
            headers.get(&PERMISSIONS_POLICY).unwrap(),
            PERMISSIONS_POLICY_VALUE
        );
        assert!(headers.get(CONTENT_SECURITY_POLICY).is_some());
        // No HSTS outside production.
        assert!(headers.get(STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[test]
    fn hsts_only_in_production() {
        let mut config = GatewayConfig::default();
        config.environment = Environment::Production;
        let headers_set = SecurityHeaders::from_config(&config);
        let mut headers = HeaderMap::new();
        headers_set.apply(&mut headers);
        assert_eq!(headers.get(STRICT_TRANSPORT_SECURITY).unwrap(), HSTS_VALUE);
    }

    #[test]
    fn application_is_idempotent() {
        let headers_set = SecurityHeaders::from_config(&GatewayConfig::default());
        let mut once = HeaderMap::new();
        headers_set.apply(&mut once);
        let mut twice = HeaderMap::new();
        headers_set.apply(&mut twice);
        headers_set.apply(&mut twice);
        assert_eq!(once, twice);
    }
}
