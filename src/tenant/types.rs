//! Tenant records and per-request resolution results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
}

/// A tenant as loaded from the tenant store.
///
/// Immutable once loaded for a request; cached by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TenantRecord {
    /// Store identifier; absent for synthesized default records.
    pub id: Option<Uuid>,

    /// Unique lowercase identifier usable in URL paths.
    pub slug: String,

    /// Locale applied when neither path nor cookie specify one.
    pub default_locale: String,

    pub status: TenantStatus,
}

impl TenantRecord {
    /// Synthesize the fallback record used when nothing matches.
    pub fn synthetic_default(slug: &str, default_locale: &str) -> Self {
        Self {
            id: None,
            slug: slug.to_string(),
            default_locale: default_locale.to_string(),
            status: TenantStatus::Active,
        }
    }
}

/// How the request's tenant was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Cookie,
    Domain,
    Path,
    Default,
}

impl TenantSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantSource::Cookie => "cookie",
            TenantSource::Domain => "domain",
            TenantSource::Path => "path",
            TenantSource::Default => "default",
        }
    }
}

/// Per-request tenant resolution result.
///
/// Created once per request by the resolver, consumed by the pipeline and by
/// response annotation; never persisted beyond cookies and headers.
#[derive(Debug, Clone)]
pub struct TenantResolution {
    pub tenant: TenantRecord,
    pub locale: String,

    /// Canonical path after slug/locale stripping and locale re-prefixing.
    pub normalized_path: String,

    /// True when `normalized_path` differs from the request path.
    pub rewrite_applied: bool,

    pub source: TenantSource,

    /// Bare hostname that matched a custom-domain mapping.
    pub domain_matched: Option<String>,

    /// True when a known tenant slug was stripped from the path.
    pub slug_matched_from_path: bool,

    /// True when the locale came from a path segment.
    pub locale_matched_from_path: bool,
}
