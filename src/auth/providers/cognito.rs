//! AWS Cognito adapter: verifies the `Authorization: Bearer` ID token
//! against the user pool's JWKS.

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;

use crate::auth::adapter::{AuthAdapter, AuthError, SessionInfo, UserSummary};
use crate::auth::providers::RemoteJwks;
use crate::config::schema::CognitoConfig;

#[derive(Debug, Deserialize)]
struct CognitoClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "cognito:groups")]
    groups: Vec<String>,
    #[serde(default)]
    jti: Option<String>,
}

pub struct CognitoAdapter {
    jwks: RemoteJwks,
    validation: Validation,
}

impl CognitoAdapter {
    pub fn new(config: &CognitoConfig) -> Result<Self, AuthError> {
        let region = config
            .region
            .as_deref()
            .ok_or(AuthError::NotConfigured("cognito.region"))?;
        let pool = config
            .user_pool_id
            .as_deref()
            .ok_or(AuthError::NotConfigured("cognito.user_pool_id"))?;
        let client_id = config
            .client_id
            .as_deref()
            .ok_or(AuthError::NotConfigured("cognito.client_id"))?;

        let issuer = format!("https://cognito-idp.{region}.amazonaws.com/{pool}");
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer.clone()]);
        validation.set_audience(&[client_id]);

        Ok(Self {
            jwks: RemoteJwks::new(format!("{issuer}/.well-known/jwks.json")),
            validation,
        })
    }

    async fn claims(&self, headers: &HeaderMap) -> Result<Option<CognitoClaims>, AuthError> {
        let token = match headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            Some(token) => token,
            None => return Ok(None),
        };
        match self.jwks.verify::<CognitoClaims>(token, &self.validation).await {
            Ok(data) => Ok(Some(data.claims)),
            Err(AuthError::Verification(reason)) => {
                tracing::debug!(reason = %reason, "Cognito token rejected");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl AuthAdapter for CognitoAdapter {
    fn name(&self) -> &'static str {
        "cognito"
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<UserSummary>, AuthError> {
        Ok(self.claims(headers).await?.map(|claims| UserSummary {
            id: claims.sub,
            email: claims.email,
            role: claims.groups.into_iter().next(),
        }))
    }

    async fn session(&self, headers: &HeaderMap) -> Result<Option<SessionInfo>, AuthError> {
        Ok(self.claims(headers).await?.map(|claims| SessionInfo {
            id: claims.jti.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        }))
    }
}
