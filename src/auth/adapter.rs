//! Provider-agnostic authentication adapter boundary.
//!
//! One adapter is constructed at startup from configuration and shared for
//! the process lifetime. Adapters are polymorphic over the capability set
//! {current user, session, sign-out, route gate}; the gate's decision logic
//! is shared, so providers only implement credential verification.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Response};
use axum::response::{IntoResponse, Redirect};
use serde::{Deserialize, Serialize};

use crate::auth::gate::evaluate_routes;
use crate::config::schema::AuthConfig;
use crate::http::cookies::remove_cookie;

/// Authenticated-user summary carried through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Provider session handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub user_id: String,
}

/// Adapter failure. The gate fails closed on any of these.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("token verification failed: {0}")]
    Verification(String),

    #[error("provider request failed: {0}")]
    Transport(String),
}

/// Outcome of a gate evaluation: the resolved user (for downstream context)
/// and, when the route demands it, a terminal redirect.
#[derive(Debug)]
pub struct GateDecision {
    pub user: Option<UserSummary>,
    pub response: Option<Response<Body>>,
}

/// Route-guard settings handed to the gate entry point.
#[derive(Debug, Clone)]
pub struct RouteGuardConfig {
    pub protected_routes: Vec<String>,
    pub public_routes: Vec<String>,
    pub sign_in_url: String,
    pub sign_up_url: String,
    pub after_sign_in_url: String,
    pub after_sign_up_url: String,
    pub after_sign_out_url: String,
}

impl From<&AuthConfig> for RouteGuardConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            protected_routes: config.protected_routes.clone(),
            public_routes: config.public_routes.clone(),
            sign_in_url: config.sign_in_url.clone(),
            sign_up_url: config.sign_up_url.clone(),
            after_sign_in_url: config.after_sign_in_url.clone(),
            after_sign_up_url: config.after_sign_up_url.clone(),
            after_sign_out_url: config.after_sign_out_url.clone(),
        }
    }
}

/// Per-provider authentication capability set.
#[async_trait]
pub trait AuthAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve the authenticated user from request headers, if any.
    /// Invalid or expired credentials resolve to `None`; infrastructure
    /// failures are errors.
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<UserSummary>, AuthError>;

    /// Resolve the provider session, if any.
    async fn session(&self, headers: &HeaderMap) -> Result<Option<SessionInfo>, AuthError>;

    /// Name of the provider's session cookie, when it uses one.
    fn session_cookie(&self) -> Option<&'static str> {
        None
    }

    /// Route-protection entry point. A `response` in the decision is
    /// terminal; `None` continues to locale routing.
    async fn gate(
        &self,
        headers: &HeaderMap,
        path: &str,
        locale: &str,
        default_locale: &str,
        routes: &RouteGuardConfig,
    ) -> Result<GateDecision, AuthError> {
        let user = self.current_user(headers).await?;
        let response = evaluate_routes(user.is_some(), path, locale, default_locale, routes);
        Ok(GateDecision { user, response })
    }

    /// Terminate the session: redirect to the post-sign-out URL, clearing the
    /// provider session cookie when there is one.
    async fn sign_out(&self, routes: &RouteGuardConfig) -> Result<Response<Body>, AuthError> {
        let mut response = Redirect::to(&routes.after_sign_out_url).into_response();
        if let Some(cookie_name) = self.session_cookie() {
            remove_cookie(response.headers_mut(), cookie_name);
        }
        Ok(response)
    }
}
