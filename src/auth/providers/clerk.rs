//! Clerk adapter: verifies the `__session` cookie JWT against the
//! instance's PEM public key.

use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::auth::adapter::{AuthAdapter, AuthError, SessionInfo, UserSummary};
use crate::config::schema::ClerkConfig;
use crate::http::cookies::request_cookie;

const SESSION_COOKIE: &str = "__session";

#[derive(Debug, Deserialize)]
struct ClerkClaims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    org_role: Option<String>,
}

pub struct ClerkAdapter {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClerkAdapter {
    pub fn new(config: &ClerkConfig) -> Result<Self, AuthError> {
        let pem = config
            .jwt_public_key
            .as_deref()
            .ok_or(AuthError::NotConfigured("clerk.jwt_public_key"))?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Verification(e.to_string()))?;
        Ok(Self {
            decoding_key,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    fn claims(&self, headers: &HeaderMap) -> Option<ClerkClaims> {
        let token = request_cookie(headers, SESSION_COOKIE)?;
        match decode::<ClerkClaims>(&token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(error) => {
                tracing::debug!(error = %error, "Clerk session token rejected");
                None
            }
        }
    }
}

#[async_trait]
impl AuthAdapter for ClerkAdapter {
    fn name(&self) -> &'static str {
        "clerk"
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<UserSummary>, AuthError> {
        Ok(self.claims(headers).map(|claims| UserSummary {
            id: claims.sub,
            email: claims.email,
            role: claims.org_role,
        }))
    }

    async fn session(&self, headers: &HeaderMap) -> Result<Option<SessionInfo>, AuthError> {
        Ok(self.claims(headers).map(|claims| SessionInfo {
            id: claims.sid.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        }))
    }

    fn session_cookie(&self) -> Option<&'static str> {
        Some(SESSION_COOKIE)
    }
}
