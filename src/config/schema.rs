//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deployment environment. Drives cookie security, HSTS, and the
    /// default bot-rule mode.
    pub environment: Environment,

    /// Tenant resolution settings.
    pub tenants: TenantsConfig,

    /// Locale routing settings.
    pub locales: LocalesConfig,

    /// CORS allowlist settings.
    pub cors: CorsConfig,

    /// Security header / CSP settings.
    pub security: SecurityConfig,

    /// Bot detection and API rate limiting.
    pub abuse: AbuseConfig,

    /// Authentication provider and route guard settings.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Development,
}

impl Environment {
    /// True for production deployments (secure cookies, HSTS, live bot rule).
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Tenant resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantsConfig {
    /// Slug of the tenant synthesized when nothing matches.
    pub default_slug: String,

    /// TTL for tenant lookup cache entries, in seconds.
    pub cache_ttl_secs: u64,

    /// Tenants seeded into the in-memory store by the binary. Deployments
    /// backing `TenantStore` with a database leave this empty.
    pub seed: Vec<TenantSeed>,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            default_slug: "default".to_string(),
            cache_ttl_secs: 300,
            seed: Vec::new(),
        }
    }
}

/// One seeded tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantSeed {
    pub slug: String,

    #[serde(default = "default_seed_locale")]
    pub default_locale: String,

    /// Optional custom domain bound to this tenant.
    pub domain: Option<String>,
}

fn default_seed_locale() -> String {
    "en".to_string()
}

/// Locale routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalesConfig {
    /// Application default locale, omitted from canonical paths.
    pub default_locale: String,

    /// Recognized locale codes.
    pub supported: Vec<String>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            supported: vec!["en".to_string(), "fr".to_string(), "de".to_string()],
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Public application URL (first allowlist entry when set).
    pub app_url: Option<String>,

    /// Public marketing-site URL.
    pub site_url: Option<String>,

    /// Additional allowed origins (local development by default).
    pub dev_origins: Vec<String>,
}

impl CorsConfig {
    /// Assemble the explicit origin allowlist, in configured order.
    pub fn allowlist(&self) -> Vec<String> {
        let mut origins = Vec::new();
        if let Some(url) = &self.app_url {
            origins.push(url.trim_end_matches('/').to_string());
        }
        if let Some(url) = &self.site_url {
            origins.push(url.trim_end_matches('/').to_string());
        }
        origins.extend(self.dev_origins.iter().cloned());
        origins
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            app_url: None,
            site_url: None,
            dev_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Error-monitoring DSN; its origin is appended to `connect-src`.
    pub error_monitoring_dsn: Option<String>,

    /// Analytics ingestion host; appended to `connect-src` and `script-src`.
    pub analytics_host: Option<String>,
}

/// Bot detection and API rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AbuseConfig {
    /// Detection API key. When absent the guard is a no-op (fail-open).
    pub api_key: Option<String>,

    /// Explicit bot-rule mode. Defaults by environment when unset:
    /// live in production, dry-run otherwise.
    pub mode: Option<BotRuleMode>,

    /// Bot categories exempt from denial.
    pub allowed_bot_categories: Vec<String>,

    /// Tokens added per refill interval.
    pub refill_rate: u32,

    /// Refill interval as a duration string ("60s", "5m", "2h", "1d").
    pub interval: String,

    /// Bucket capacity (burst).
    pub capacity: u32,

    /// Override for the Retry-After header, in seconds.
    pub retry_after_secs: Option<u64>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            mode: None,
            allowed_bot_categories: vec![
                "search_engine".to_string(),
                "preview".to_string(),
                "monitor".to_string(),
            ],
            refill_rate: 60,
            interval: "60s".to_string(),
            capacity: 120,
            retry_after_secs: None,
        }
    }
}

/// Bot rule evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotRuleMode {
    /// Deny on violation.
    Live,
    /// Log violations, never deny.
    DryRun,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Which auth adapter to construct at startup.
    pub provider: AuthProviderKind,

    /// Sign-in page path.
    pub sign_in_url: String,

    /// Sign-up page path.
    pub sign_up_url: String,

    /// Redirect target after successful sign-in.
    pub after_sign_in_url: String,

    /// Redirect target after successful sign-up.
    pub after_sign_up_url: String,

    /// Redirect target after sign-out.
    pub after_sign_out_url: String,

    /// Path prefixes requiring an authenticated user.
    pub protected_routes: Vec<String>,

    /// Path prefixes always public (checked before protected).
    pub public_routes: Vec<String>,

    /// Clerk provider settings.
    pub clerk: ClerkConfig,

    /// Cloudflare Access provider settings.
    pub cloudflare: CloudflareConfig,

    /// AWS Cognito provider settings.
    pub cognito: CognitoConfig,

    /// Sliding-window limits for auth operations.
    pub rate_limits: AuthRateLimitsConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: AuthProviderKind::Test,
            sign_in_url: "/sign-in".to_string(),
            sign_up_url: "/sign-up".to_string(),
            after_sign_in_url: "/dashboard".to_string(),
            after_sign_up_url: "/dashboard".to_string(),
            after_sign_out_url: "/".to_string(),
            protected_routes: vec!["/dashboard".to_string(), "/onboarding".to_string()],
            public_routes: Vec::new(),
            clerk: ClerkConfig::default(),
            cloudflare: CloudflareConfig::default(),
            cognito: CognitoConfig::default(),
            rate_limits: AuthRateLimitsConfig::default(),
        }
    }
}

/// Supported auth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    Clerk,
    Cloudflare,
    Cognito,
    Test,
}

/// Clerk provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClerkConfig {
    /// Publishable key; presence also extends the CSP with Clerk domains.
    pub publishable_key: Option<String>,

    /// PEM-encoded RSA public key for session JWT verification.
    pub jwt_public_key: Option<String>,
}

/// Cloudflare Access provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CloudflareConfig {
    /// Access team domain, e.g. "example.cloudflareaccess.com".
    pub team_domain: Option<String>,

    /// Application audience (AUD) tag.
    pub audience: Option<String>,
}

/// AWS Cognito provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CognitoConfig {
    /// AWS region hosting the user pool.
    pub region: Option<String>,

    /// User pool ID.
    pub user_pool_id: Option<String>,

    /// App client ID (token audience).
    pub client_id: Option<String>,
}

/// Sliding-window limits for the authentication operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthRateLimitsConfig {
    pub sign_in: WindowPolicyConfig,
    pub sign_up: WindowPolicyConfig,
    pub password_reset: WindowPolicyConfig,
    pub mfa: WindowPolicyConfig,
    pub oauth_callback: WindowPolicyConfig,
}

impl Default for AuthRateLimitsConfig {
    fn default() -> Self {
        Self {
            sign_in: WindowPolicyConfig::new(5, 900, 900),
            sign_up: WindowPolicyConfig::new(3, 3600, 3600),
            password_reset: WindowPolicyConfig::new(3, 3600, 3600),
            mfa: WindowPolicyConfig::new(5, 900, 1800),
            oauth_callback: WindowPolicyConfig::new(10, 900, 900),
        }
    }
}

/// One sliding-window policy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowPolicyConfig {
    /// Attempts allowed inside the window.
    pub max_attempts: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Block duration applied once the window is exceeded, in seconds.
    pub block_secs: u64,
}

impl WindowPolicyConfig {
    pub const fn new(max_attempts: u32, window_secs: u64, block_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
            block_secs,
        }
    }
}

impl Default for WindowPolicyConfig {
    fn default() -> Self {
        Self::new(5, 900, 900)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
