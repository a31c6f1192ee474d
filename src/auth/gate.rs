//! Route-protection state machine.
//!
//! Evaluated once per request, only when the path matches a protected route
//! or an auth page (locale-prefixed or not):
//! - unauthenticated on a protected route → redirect to locale-aware sign-in
//! - authenticated on an auth page → redirect to the post-sign-in URL
//! - anything else → continue
//!
//! An adapter failure is treated as "unauthenticated" so protected routes
//! fail closed into the sign-in redirect.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Response};
use axum::response::{IntoResponse, Redirect};

use crate::auth::adapter::{AuthAdapter, GateDecision, RouteGuardConfig};
use crate::i18n::i18n_path;
use crate::observability::metrics;

/// Pipeline-facing auth gate.
pub struct AuthGate {
    adapter: Arc<dyn AuthAdapter>,
    routes: RouteGuardConfig,
    default_locale: String,
}

impl AuthGate {
    pub fn new(
        adapter: Arc<dyn AuthAdapter>,
        routes: RouteGuardConfig,
        default_locale: String,
    ) -> Self {
        Self {
            adapter,
            routes,
            default_locale,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn AuthAdapter> {
        &self.adapter
    }

    /// Run the gate. A `response` in the decision is terminal; routes that
    /// match neither pattern skip the adapter entirely.
    pub async fn check(&self, headers: &HeaderMap, path: &str, locale: &str) -> GateDecision {
        let bare = strip_locale(path, locale);
        if !is_protected(bare, &self.routes) && !is_auth_page(bare, &self.routes) {
            return GateDecision {
                user: None,
                response: None,
            };
        }

        let decision = match self
            .adapter
            .gate(headers, path, locale, &self.default_locale, &self.routes)
            .await
        {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(
                    provider = self.adapter.name(),
                    error = %error,
                    "Auth adapter failed during gate evaluation, failing closed"
                );
                GateDecision {
                    user: None,
                    response: evaluate_routes(
                        false,
                        path,
                        locale,
                        &self.default_locale,
                        &self.routes,
                    ),
                }
            }
        };

        if decision.response.is_some() {
            metrics::record_auth_redirect();
        }
        decision
    }
}

/// The decision table shared by every adapter's gate entry point.
pub fn evaluate_routes(
    authenticated: bool,
    path: &str,
    locale: &str,
    default_locale: &str,
    routes: &RouteGuardConfig,
) -> Option<Response<Body>> {
    let bare = strip_locale(path, locale);

    if !authenticated && is_protected(bare, routes) {
        let target = i18n_path(&routes.sign_in_url, locale, default_locale);
        tracing::debug!(path = %path, redirect = %target, "Unauthenticated on protected route");
        return Some(Redirect::temporary(&target).into_response());
    }

    if authenticated && is_auth_page(bare, routes) {
        let target = i18n_path(&routes.after_sign_in_url, locale, default_locale);
        tracing::debug!(path = %path, redirect = %target, "Authenticated on auth page");
        return Some(Redirect::temporary(&target).into_response());
    }

    None
}

/// Drop a leading segment equal to the resolved locale.
fn strip_locale<'a>(path: &'a str, locale: &str) -> &'a str {
    let prefix_len = locale.len() + 1;
    if path.len() >= prefix_len && path[1..].starts_with(locale) && path.starts_with('/') {
        let rest = &path[prefix_len..];
        if rest.is_empty() {
            "/"
        } else if rest.starts_with('/') {
            rest
        } else {
            path
        }
    } else {
        path
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

fn is_protected(path: &str, routes: &RouteGuardConfig) -> bool {
    if routes.public_routes.iter().any(|p| matches_prefix(path, p)) {
        return false;
    }
    routes
        .protected_routes
        .iter()
        .any(|p| matches_prefix(path, p))
}

fn is_auth_page(path: &str, routes: &RouteGuardConfig) -> bool {
    matches_prefix(path, &routes.sign_in_url) || matches_prefix(path, &routes.sign_up_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::LOCATION, StatusCode};

    fn routes() -> RouteGuardConfig {
        RouteGuardConfig {
            protected_routes: vec!["/dashboard".to_string(), "/onboarding".to_string()],
            public_routes: vec!["/dashboard/public".to_string()],
            sign_in_url: "/sign-in".to_string(),
            sign_up_url: "/sign-up".to_string(),
            after_sign_in_url: "/dashboard".to_string(),
            after_sign_up_url: "/dashboard".to_string(),
            after_sign_out_url: "/".to_string(),
        }
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    #[test]
    fn unauthenticated_protected_redirects_to_localized_sign_in() {
        let response = evaluate_routes(false, "/fr/dashboard", "fr", "en", &routes()).unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/fr/sign-in");
    }

    #[test]
    fn default_locale_sign_in_is_unprefixed() {
        let response = evaluate_routes(false, "/dashboard", "en", "en", &routes()).unwrap();
        assert_eq!(location(&response), "/sign-in");
    }

    #[test]
    fn authenticated_auth_page_redirects_to_after_sign_in() {
        let response = evaluate_routes(true, "/sign-in", "en", "en", &routes()).unwrap();
        assert_eq!(location(&response), "/dashboard");

        let response = evaluate_routes(true, "/fr/sign-up", "fr", "en", &routes()).unwrap();
        assert_eq!(location(&response), "/fr/dashboard");
    }

    #[test]
    fn authenticated_protected_continues() {
        assert!(evaluate_routes(true, "/dashboard/settings", "en", "en", &routes()).is_none());
    }

    #[test]
    fn unauthenticated_public_continues() {
        assert!(evaluate_routes(false, "/pricing", "en", "en", &routes()).is_none());
        // Public prefix carves out of a protected prefix.
        assert!(evaluate_routes(false, "/dashboard/public", "en", "en", &routes()).is_none());
    }

    #[test]
    fn prefix_matching_requires_segment_boundary() {
        assert!(evaluate_routes(false, "/dashboarding", "en", "en", &routes()).is_none());
    }

    #[test]
    fn strip_locale_handles_edge_shapes() {
        assert_eq!(strip_locale("/fr/dashboard", "fr"), "/dashboard");
        assert_eq!(strip_locale("/fr", "fr"), "/");
        assert_eq!(strip_locale("/fresh", "fr"), "/fresh");
        assert_eq!(strip_locale("/dashboard", "fr"), "/dashboard");
    }
}
