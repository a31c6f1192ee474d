//! Auth provider implementations and the startup factory.
//!
//! One adapter is selected per process from configuration. The test adapter
//! is only constructible outside production; the factory is the single place
//! adapters come from, so that guarantee holds process-wide.

pub mod clerk;
pub mod cloudflare;
pub mod cognito;
pub mod test;

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, DecodingKey, TokenData, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::auth::adapter::{AuthAdapter, AuthError};
use crate::config::schema::{AuthConfig, AuthProviderKind, Environment};

pub use clerk::ClerkAdapter;
pub use cloudflare::CloudflareAdapter;
pub use cognito::CognitoAdapter;
pub use test::TestAdapter;

/// Factory result. `test` is populated only for the test provider, giving
/// sibling test routes access to the shared user/session maps.
pub struct BuiltAdapter {
    pub adapter: Arc<dyn AuthAdapter>,
    pub test: Option<Arc<TestAdapter>>,
}

/// Construct the configured adapter. Called once at startup.
pub fn build_adapter(
    config: &AuthConfig,
    environment: Environment,
) -> Result<BuiltAdapter, AuthError> {
    match config.provider {
        AuthProviderKind::Clerk => Ok(BuiltAdapter {
            adapter: Arc::new(ClerkAdapter::new(&config.clerk)?),
            test: None,
        }),
        AuthProviderKind::Cloudflare => Ok(BuiltAdapter {
            adapter: Arc::new(CloudflareAdapter::new(&config.cloudflare)?),
            test: None,
        }),
        AuthProviderKind::Cognito => Ok(BuiltAdapter {
            adapter: Arc::new(CognitoAdapter::new(&config.cognito)?),
            test: None,
        }),
        AuthProviderKind::Test => {
            if environment.is_production() {
                return Err(AuthError::NotConfigured(
                    "test adapter is not available in production",
                ));
            }
            let adapter = Arc::new(TestAdapter::new());
            Ok(BuiltAdapter {
                adapter: adapter.clone(),
                test: Some(adapter),
            })
        }
    }
}

/// A provider JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    n: String,
    e: String,
}

impl Jwks {
    fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => self.keys.first(),
        }
    }
}

/// Lazily fetched, cached JWKS endpoint.
pub(crate) struct RemoteJwks {
    url: String,
    http: reqwest::Client,
    cached: RwLock<Option<Jwks>>,
}

impl RemoteJwks {
    pub(crate) fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    async fn get(&self) -> Result<Jwks, AuthError> {
        if let Some(jwks) = self.cached.read().await.clone() {
            return Ok(jwks);
        }
        let jwks: Jwks = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        *self.cached.write().await = Some(jwks.clone());
        Ok(jwks)
    }

    /// Verify an RS256 token against the key set.
    ///
    /// A malformed or expired token is a verification error; only transport
    /// failures while fetching keys surface as `Transport`.
    pub(crate) async fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<TokenData<C>, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::Verification(e.to_string()))?;
        let jwks = self.get().await?;
        let jwk = jwks
            .find(header.kid.as_deref())
            .ok_or_else(|| AuthError::Verification("no matching key".to_string()))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::Verification(e.to_string()))?;
        decode::<C>(token, &key, validation).map_err(|e| AuthError::Verification(e.to_string()))
    }
}
