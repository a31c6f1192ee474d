//! Per-request tenant and locale resolution.
//!
//! # Responsibilities
//! - Map cookies, host header, and path segments to a tenant identity
//! - Resolve the request locale and rebuild the canonical path
//! - Mirror the resolution onto responses (cookies + headers)
//!
//! # Design Decisions
//! - Domain match is authoritative and overrides a cookie match
//! - A known-slug path segment is always stripped when no domain matched,
//!   even if the tenant was already adopted from a cookie
//! - Store "relation missing" is recovered as "no tenant", never an error

use std::sync::Arc;

use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use cookie::SameSite;

use crate::config::schema::{LocalesConfig, TenantsConfig};
use crate::http::cookies::{remove_cookie, request_cookie, set_cookie};
use crate::observability::metrics;
use crate::tenant::cache::TenantCache;
use crate::tenant::store::{StoreError, TenantStore};
use crate::tenant::types::{TenantRecord, TenantResolution, TenantSource};

pub const TENANT_SLUG_COOKIE: &str = "tenant_slug";
pub const TENANT_LOCALE_COOKIE: &str = "tenant_locale";
pub const TENANT_DOMAIN_COOKIE: &str = "tenant_domain";

pub const TENANT_SLUG_HEADER: &str = "tenant-slug";
pub const TENANT_LOCALE_HEADER: &str = "tenant-locale";
pub const TENANT_SOURCE_HEADER: &str = "tenant-source";
pub const TENANT_DOMAIN_HEADER: &str = "tenant-domain";

/// Resolves inbound requests to a tenant, locale, and canonical path.
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    cache: TenantCache,
    tenants: TenantsConfig,
    locales: LocalesConfig,
}

impl TenantResolver {
    pub fn new(
        store: Arc<dyn TenantStore>,
        cache: TenantCache,
        tenants: TenantsConfig,
        locales: LocalesConfig,
    ) -> Self {
        Self {
            store,
            cache,
            tenants,
            locales,
        }
    }

    /// Resolve a request. Pure over request state plus the lookup cache; no
    /// side effects on the request itself.
    pub fn resolve<B>(
        &self,
        req: &Request<B>,
    ) -> impl std::future::Future<Output = Result<TenantResolution, StoreError>> + Send + '_ {
        // Extract owned request state synchronously so the returned future
        // borrows only `self` and never the request body (axum's `Body` is not
        // `Sync`, so an `async fn` holding `&Request<B>` would be `!Send`).
        let original_path = req.uri().path().to_string();
        let headers = req.headers().clone();
        self.resolve_inner(original_path, headers)
    }

    async fn resolve_inner(
        &self,
        original_path: String,
        headers: HeaderMap,
    ) -> Result<TenantResolution, StoreError> {
        let mut adopted: Option<(TenantRecord, TenantSource)> = None;

        // 1. Tenant-slug cookie, tentatively.
        if let Some(slug) = request_cookie(&headers, TENANT_SLUG_COOKIE) {
            if let Some(record) = self.lookup_slug(&slug).await? {
                adopted = Some((record, TenantSource::Cookie));
            }
        }

        // 2. Custom domain; authoritative, overrides the cookie.
        let mut domain_matched = None;
        if let Some(host) = bare_hostname(&headers) {
            if let Some(record) = self.lookup_domain(&host).await? {
                adopted = Some((record, TenantSource::Domain));
                domain_matched = Some(host);
            }
        }

        let mut segments: Vec<String> = original_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        // 3. Path slug; only consulted when no domain matched. The segment is
        //    stripped whenever it names a known tenant, but adoption keeps the
        //    earlier cookie match.
        let mut slug_matched_from_path = false;
        if domain_matched.is_none() {
            if let Some(first) = segments.first().cloned() {
                if let Some(record) = self.lookup_slug(&first).await? {
                    segments.remove(0);
                    slug_matched_from_path = true;
                    if adopted.is_none() {
                        adopted = Some((record, TenantSource::Path));
                    }
                }
            }
        }

        // 4. Fall back to the synthesized default tenant.
        let (tenant, source) = adopted.unwrap_or_else(|| {
            (
                TenantRecord::synthetic_default(
                    &self.tenants.default_slug,
                    &self.locales.default_locale,
                ),
                TenantSource::Default,
            )
        });

        // 5. Locale: path segment, then cookie, then tenant default.
        let mut locale_matched_from_path = false;
        let locale = if let Some(first) = segments.first().cloned() {
            if self.is_supported_locale(&first) {
                segments.remove(0);
                locale_matched_from_path = true;
                first
            } else {
                self.locale_from_cookie_or_default(&headers, &tenant)
            }
        } else {
            self.locale_from_cookie_or_default(&headers, &tenant)
        };

        // 6. Canonical path; the default locale is omitted.
        let normalized_path = build_path(&locale, &self.locales.default_locale, &segments);
        let rewrite_applied = normalized_path != original_path;

        metrics::record_tenant_resolution(source.as_str());

        Ok(TenantResolution {
            tenant,
            locale,
            normalized_path,
            rewrite_applied,
            source,
            domain_matched,
            slug_matched_from_path,
            locale_matched_from_path,
        })
    }

    fn is_supported_locale(&self, candidate: &str) -> bool {
        self.locales.supported.iter().any(|l| l == candidate)
    }

    fn locale_from_cookie_or_default(&self, headers: &HeaderMap, tenant: &TenantRecord) -> String {
        if let Some(locale) = request_cookie(headers, TENANT_LOCALE_COOKIE) {
            if self.is_supported_locale(&locale) {
                return locale;
            }
        }
        tenant.default_locale.clone()
    }

    async fn lookup_slug(&self, slug: &str) -> Result<Option<TenantRecord>, StoreError> {
        let key = TenantCache::slug_key(slug);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let found = match self.store.find_by_slug(slug).await {
            Ok(found) => found,
            Err(StoreError::RelationMissing(relation)) => {
                tracing::debug!(relation = %relation, "Tenant relation missing, treating as no tenant");
                None
            }
            Err(other) => return Err(other),
        };
        self.cache.insert(key, found.clone());
        Ok(found)
    }

    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError> {
        let key = TenantCache::domain_key(host);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let found = match self.store.find_by_domain(host).await {
            Ok(found) => found,
            Err(StoreError::RelationMissing(relation)) => {
                tracing::debug!(relation = %relation, "Tenant relation missing, treating as no tenant");
                None
            }
            Err(other) => return Err(other),
        };
        self.cache.insert(key, found.clone());
        Ok(found)
    }
}

/// Host header reduced to a bare lowercase hostname (port stripped).
fn bare_hostname(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let bare = host.split(':').next()?.trim().to_lowercase();
    if bare.is_empty() {
        None
    } else {
        Some(bare)
    }
}

/// Rebuild a canonical path from the resolved locale and remaining segments.
fn build_path(locale: &str, default_locale: &str, segments: &[String]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);
    if locale != default_locale {
        parts.push(locale);
    }
    parts.extend(segments.iter().map(String::as_str));
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Mirror a resolution onto an outgoing response.
///
/// Cookies are written only when they differ from what the request carried.
/// A stale `tenant_domain` cookie is deleted when the resolution is not
/// domain-sourced.
pub fn annotate_response<B>(
    request_headers: &HeaderMap,
    resolution: &TenantResolution,
    response: &mut Response<B>,
    secure: bool,
) {
    let headers = response.headers_mut();

    if request_cookie(request_headers, TENANT_SLUG_COOKIE).as_deref()
        != Some(resolution.tenant.slug.as_str())
    {
        set_cookie(
            headers,
            TENANT_SLUG_COOKIE,
            &resolution.tenant.slug,
            SameSite::Lax,
            secure,
        );
    }
    if request_cookie(request_headers, TENANT_LOCALE_COOKIE).as_deref()
        != Some(resolution.locale.as_str())
    {
        set_cookie(
            headers,
            TENANT_LOCALE_COOKIE,
            &resolution.locale,
            SameSite::Lax,
            secure,
        );
    }

    match &resolution.domain_matched {
        Some(domain) if resolution.source == TenantSource::Domain => {
            if request_cookie(request_headers, TENANT_DOMAIN_COOKIE).as_deref() != Some(domain) {
                set_cookie(headers, TENANT_DOMAIN_COOKIE, domain, SameSite::Lax, secure);
            }
            if let Ok(value) = HeaderValue::from_str(domain) {
                headers.insert(TENANT_DOMAIN_HEADER, value);
            }
        }
        _ => {
            if request_cookie(request_headers, TENANT_DOMAIN_COOKIE).is_some() {
                remove_cookie(headers, TENANT_DOMAIN_COOKIE);
            }
        }
    }

    if let Ok(value) = HeaderValue::from_str(&resolution.tenant.slug) {
        headers.insert(TENANT_SLUG_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&resolution.locale) {
        headers.insert(TENANT_LOCALE_HEADER, value);
    }
    headers.insert(
        TENANT_SOURCE_HEADER,
        HeaderValue::from_static(resolution.source.as_str()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::store::InMemoryTenantStore;
    use axum::body::Body;
    use std::time::Duration;

    fn resolver_with(store: InMemoryTenantStore) -> TenantResolver {
        TenantResolver::new(
            Arc::new(store),
            TenantCache::new(Duration::from_secs(60)),
            TenantsConfig::default(),
            LocalesConfig::default(),
        )
    }

    fn seeded_store() -> InMemoryTenantStore {
        let store = InMemoryTenantStore::new();
        store.insert(TenantRecord::synthetic_default("acme", "fr"));
        store.insert(TenantRecord::synthetic_default("globex", "en"));
        store.map_domain("app.acme.io", "acme");
        store
    }

    fn request(path: &str, host: &str, cookies: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path).header(HOST, host);
        if let Some(cookies) = cookies {
            builder = builder.header("cookie", cookies);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn cookie_resolves_tenant() {
        let resolver = resolver_with(seeded_store());
        let req = request("/about", "localhost", Some("tenant_slug=acme"));
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.source, TenantSource::Cookie);
        assert_eq!(res.tenant.slug, "acme");
    }

    #[tokio::test]
    async fn domain_overrides_cookie() {
        let resolver = resolver_with(seeded_store());
        let req = request("/about", "app.acme.io:443", Some("tenant_slug=globex"));
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.source, TenantSource::Domain);
        assert_eq!(res.tenant.slug, "acme");
        assert_eq!(res.domain_matched.as_deref(), Some("app.acme.io"));
    }

    #[tokio::test]
    async fn path_slug_is_stripped_and_adopted() {
        let resolver = resolver_with(seeded_store());
        let req = request("/globex/en/pricing", "localhost", None);
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.source, TenantSource::Path);
        assert_eq!(res.tenant.slug, "globex");
        assert!(res.slug_matched_from_path);
        assert!(res.locale_matched_from_path);
        assert_eq!(res.normalized_path, "/pricing");
        assert!(res.rewrite_applied);
    }

    #[tokio::test]
    async fn path_slug_is_stripped_even_with_cookie_match() {
        let resolver = resolver_with(seeded_store());
        let req = request("/globex/pricing", "localhost", Some("tenant_slug=acme"));
        let res = resolver.resolve(&req).await.unwrap();
        // Cookie still wins the tenant; the path segment is still consumed.
        assert_eq!(res.source, TenantSource::Cookie);
        assert_eq!(res.tenant.slug, "acme");
        assert!(res.slug_matched_from_path);
        assert_eq!(res.normalized_path, "/fr/pricing");
    }

    #[tokio::test]
    async fn default_tenant_when_nothing_matches() {
        let resolver = resolver_with(seeded_store());
        let req = request("/pricing", "unmapped.example.com", None);
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.source, TenantSource::Default);
        assert_eq!(res.tenant.slug, "default");
        assert_eq!(res.locale, "en");
        assert!(!res.rewrite_applied);
    }

    #[tokio::test]
    async fn tenant_default_locale_applies_without_path_or_cookie_locale() {
        let resolver = resolver_with(seeded_store());
        let req = request("/pricing", "localhost", Some("tenant_slug=acme"));
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.locale, "fr");
        assert_eq!(res.normalized_path, "/fr/pricing");
        assert!(res.rewrite_applied);
    }

    #[tokio::test]
    async fn default_locale_is_omitted_from_canonical_path() {
        let resolver = resolver_with(seeded_store());
        let req = request("/en/pricing", "localhost", None);
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.locale, "en");
        assert!(res.locale_matched_from_path);
        assert_eq!(res.normalized_path, "/pricing");
        assert!(res.rewrite_applied);
    }

    #[tokio::test]
    async fn relation_missing_recovers_as_no_tenant() {
        struct MissingRelationStore;

        #[async_trait::async_trait]
        impl TenantStore for MissingRelationStore {
            async fn find_by_slug(
                &self,
                _slug: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                Err(StoreError::RelationMissing("tenant".to_string()))
            }

            async fn find_by_domain(
                &self,
                _domain: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                Err(StoreError::RelationMissing("tenant".to_string()))
            }
        }

        let resolver = TenantResolver::new(
            Arc::new(MissingRelationStore),
            TenantCache::new(Duration::from_secs(60)),
            TenantsConfig::default(),
            LocalesConfig::default(),
        );
        let req = request("/pricing", "localhost", Some("tenant_slug=acme"));
        let res = resolver.resolve(&req).await.unwrap();
        assert_eq!(res.source, TenantSource::Default);
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl TenantStore for FailingStore {
            async fn find_by_slug(
                &self,
                _slug: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                Err(StoreError::Backend("connection refused".to_string()))
            }

            async fn find_by_domain(
                &self,
                _domain: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                Err(StoreError::Backend("connection refused".to_string()))
            }
        }

        let resolver = TenantResolver::new(
            Arc::new(FailingStore),
            TenantCache::new(Duration::from_secs(60)),
            TenantsConfig::default(),
            LocalesConfig::default(),
        );
        let req = request("/pricing", "localhost", Some("tenant_slug=acme"));
        assert!(resolver.resolve(&req).await.is_err());
    }

    #[tokio::test]
    async fn negative_lookups_are_cached_until_expiry() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingStore(AtomicU32);

        #[async_trait::async_trait]
        impl TenantStore for CountingStore {
            async fn find_by_slug(
                &self,
                _slug: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }

            async fn find_by_domain(
                &self,
                _domain: &str,
            ) -> Result<Option<TenantRecord>, StoreError> {
                Ok(None)
            }
        }

        let store = Arc::new(CountingStore(AtomicU32::new(0)));
        let resolver = TenantResolver::new(
            store.clone(),
            TenantCache::new(Duration::from_secs(60)),
            TenantsConfig::default(),
            LocalesConfig::default(),
        );

        let req = request("/pricing", "localhost", Some("tenant_slug=ghost"));
        resolver.resolve(&req).await.unwrap();
        resolver.resolve(&req).await.unwrap();
        assert_eq!(store.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn annotation_mirrors_resolution() {
        let resolution = TenantResolution {
            tenant: TenantRecord::synthetic_default("acme", "fr"),
            locale: "fr".to_string(),
            normalized_path: "/fr/pricing".to_string(),
            rewrite_applied: true,
            source: TenantSource::Domain,
            domain_matched: Some("app.acme.io".to_string()),
            slug_matched_from_path: false,
            locale_matched_from_path: false,
        };

        let request_headers = HeaderMap::new();
        let mut response = Response::new(Body::empty());
        annotate_response(&request_headers, &resolution, &mut response, false);

        let headers = response.headers();
        assert_eq!(headers.get(TENANT_SLUG_HEADER).unwrap(), "acme");
        assert_eq!(headers.get(TENANT_LOCALE_HEADER).unwrap(), "fr");
        assert_eq!(headers.get(TENANT_SOURCE_HEADER).unwrap(), "domain");
        assert_eq!(headers.get(TENANT_DOMAIN_HEADER).unwrap(), "app.acme.io");

        let cookies: Vec<_> = headers
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("tenant_slug=acme")));
        assert!(cookies.iter().any(|c| c.starts_with("tenant_locale=fr")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("tenant_domain=app.acme.io")));
    }

    #[test]
    fn unchanged_cookies_are_not_rewritten_and_stale_domain_is_deleted() {
        let resolution = TenantResolution {
            tenant: TenantRecord::synthetic_default("acme", "fr"),
            locale: "fr".to_string(),
            normalized_path: "/fr/pricing".to_string(),
            rewrite_applied: false,
            source: TenantSource::Cookie,
            domain_matched: None,
            slug_matched_from_path: false,
            locale_matched_from_path: false,
        };

        let mut request_headers = HeaderMap::new();
        request_headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static(
                "tenant_slug=acme; tenant_locale=fr; tenant_domain=old.acme.io",
            ),
        );
        let mut response = Response::new(Body::empty());
        annotate_response(&request_headers, &resolution, &mut response, false);

        let cookies: Vec<_> = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        // Only the stale domain cookie deletion is emitted.
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("tenant_domain="));
        assert!(cookies[0].contains("Max-Age=0"));
    }
}
