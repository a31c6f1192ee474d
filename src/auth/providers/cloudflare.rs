//! Cloudflare Access adapter: verifies the `Cf-Access-Jwt-Assertion`
//! header against the team's certificate endpoint.

use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;

use crate::auth::adapter::{AuthAdapter, AuthError, SessionInfo, UserSummary};
use crate::auth::providers::RemoteJwks;
use crate::config::schema::CloudflareConfig;

const ASSERTION_HEADER: &str = "cf-access-jwt-assertion";

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    identity_nonce: Option<String>,
}

pub struct CloudflareAdapter {
    jwks: RemoteJwks,
    validation: Validation,
}

impl CloudflareAdapter {
    pub fn new(config: &CloudflareConfig) -> Result<Self, AuthError> {
        let team_domain = config
            .team_domain
            .as_deref()
            .ok_or(AuthError::NotConfigured("cloudflare.team_domain"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("https://{team_domain}")]);
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        Ok(Self {
            jwks: RemoteJwks::new(format!("https://{team_domain}/cdn-cgi/access/certs")),
            validation,
        })
    }

    async fn claims(&self, headers: &HeaderMap) -> Result<Option<AccessClaims>, AuthError> {
        let token = match headers.get(ASSERTION_HEADER).and_then(|v| v.to_str().ok()) {
            Some(token) => token,
            None => return Ok(None),
        };
        match self.jwks.verify::<AccessClaims>(token, &self.validation).await {
            Ok(data) => Ok(Some(data.claims)),
            Err(AuthError::Verification(reason)) => {
                tracing::debug!(reason = %reason, "Access assertion rejected");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl AuthAdapter for CloudflareAdapter {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<UserSummary>, AuthError> {
        Ok(self.claims(headers).await?.map(|claims| UserSummary {
            id: claims.sub,
            email: claims.email,
            role: None,
        }))
    }

    async fn session(&self, headers: &HeaderMap) -> Result<Option<SessionInfo>, AuthError> {
        Ok(self.claims(headers).await?.map(|claims| SessionInfo {
            id: claims.identity_nonce.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        }))
    }
}
