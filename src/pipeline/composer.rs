//! The ordered request-edge pipeline.
//!
//! # Stage order
//! 1. Resolve tenant (always; its result decorates every later response)
//! 2. CORS preflight short-circuit
//! 3. Tenant-derived path rewrite
//! 4. Request annotation (headers + extensions) for downstream handlers
//! 5. Bot + rate-limit guard
//! 6. CSRF check and auth gate
//! 7. Locale routing: forward the rewritten request downstream
//!
//! Every response leaving 2–7 passes through tenant-cookie annotation, then
//! security-header annotation, in that fixed order.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::ORIGIN;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::abuse::AbuseGuard;
use crate::auth::adapter::{AuthAdapter, RouteGuardConfig};
use crate::auth::csrf;
use crate::auth::gate::AuthGate;
use crate::config::schema::GatewayConfig;
use crate::observability::metrics;
use crate::pipeline::context::RequestContext;
use crate::security::cors::{is_api_path, CorsPolicy};
use crate::security::headers::SecurityHeaders;
use crate::tenant::cache::TenantCache;
use crate::tenant::resolver::{
    annotate_response, TenantResolver, TENANT_LOCALE_HEADER, TENANT_SLUG_HEADER,
    TENANT_SOURCE_HEADER,
};
use crate::tenant::store::TenantStore;
use crate::tenant::types::TenantResolution;

/// Result of one pipeline stage.
pub enum StageOutcome {
    Continue,
    Terminal(Response<Body>),
}

impl From<Option<Response<Body>>> for StageOutcome {
    fn from(value: Option<Response<Body>>) -> Self {
        match value {
            Some(response) => StageOutcome::Terminal(response),
            None => StageOutcome::Continue,
        }
    }
}

/// The composed request-edge pipeline.
pub struct EdgePipeline {
    resolver: TenantResolver,
    cors: CorsPolicy,
    security: SecurityHeaders,
    abuse: AbuseGuard,
    gate: AuthGate,
    secure_cookies: bool,
}

impl EdgePipeline {
    pub fn new(
        config: &GatewayConfig,
        store: Arc<dyn TenantStore>,
        adapter: Arc<dyn AuthAdapter>,
    ) -> Self {
        let cache = TenantCache::new(Duration::from_secs(config.tenants.cache_ttl_secs));
        let resolver = TenantResolver::new(
            store,
            cache,
            config.tenants.clone(),
            config.locales.clone(),
        );
        let gate = AuthGate::new(
            adapter,
            RouteGuardConfig::from(&config.auth),
            config.locales.default_locale.clone(),
        );

        Self {
            resolver,
            cors: CorsPolicy::new(config.cors.allowlist()),
            security: SecurityHeaders::from_config(config),
            abuse: AbuseGuard::from_config(&config.abuse, config.environment),
            gate,
            secure_cookies: config.environment.is_production(),
        }
    }

    /// Run one request through the pipeline.
    pub async fn handle(
        &self,
        req: Request<Body>,
        client_ip: IpAddr,
        next: Next,
    ) -> Response<Body> {
        let started = Instant::now();
        let method = req.method().clone();
        let original_path = req.uri().path().to_string();
        let api_path = is_api_path(&original_path);
        let origin = req.headers().get(ORIGIN).cloned();
        let request_headers = req.headers().clone();

        // 1. Tenant resolution. A store failure (other than a missing
        //    relation, recovered inside the resolver) fails the request.
        let resolution = match self.resolver.resolve(&req).await {
            Ok(resolution) => resolution,
            Err(error) => {
                tracing::error!(error = %error, "Tenant resolution failed");
                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response();
                self.security.apply(response.headers_mut());
                metrics::record_request(method.as_str(), response.status().as_u16(), started);
                return response;
            }
        };

        // 2. Preflight short-circuit; never reaches the guard or the gate.
        if let StageOutcome::Terminal(response) = self.preflight_stage(&req) {
            return self.finish(
                response,
                &request_headers,
                &resolution,
                origin.as_ref(),
                api_path,
                &method,
                started,
            );
        }

        // 3. Tenant-derived rewrite.
        let mut req = req;
        if resolution.rewrite_applied {
            rewrite_request_path(&mut req, &resolution.normalized_path);
        }

        // 4. Annotate the request for downstream handlers.
        annotate_request(&mut req, &resolution);
        let mut context = RequestContext::new();
        context.metadata.locale = Some(resolution.locale.clone());
        context.metadata.pathname = Some(resolution.normalized_path.clone());
        req.extensions_mut().insert(resolution.clone());

        // 5. Bot + rate-limit guard.
        if let StageOutcome::Terminal(response) = self.abuse_stage(&req, client_ip) {
            return self.finish(
                response,
                &request_headers,
                &resolution,
                origin.as_ref(),
                api_path,
                &method,
                started,
            );
        }

        // 6. CSRF and the auth gate.
        if let StageOutcome::Terminal(response) =
            self.auth_stage(&req, &resolution, &mut context).await
        {
            return self.finish(
                response,
                &request_headers,
                &resolution,
                origin.as_ref(),
                api_path,
                &method,
                started,
            );
        }

        // 7. Locale routing: the rewritten request is the terminal stage.
        req.extensions_mut().insert(context);
        let response = next.run(req).await;
        self.finish(
            response,
            &request_headers,
            &resolution,
            origin.as_ref(),
            api_path,
            &method,
            started,
        )
    }

    /// Stage 2: answer `OPTIONS` on API paths at the edge.
    pub fn preflight_stage(&self, req: &Request<Body>) -> StageOutcome {
        if CorsPolicy::is_preflight(req) {
            StageOutcome::Terminal(self.cors.preflight_response(req))
        } else {
            StageOutcome::Continue
        }
    }

    /// Stage 5: bot rule and token bucket.
    pub fn abuse_stage(&self, req: &Request<Body>, client_ip: IpAddr) -> StageOutcome {
        self.abuse.check(req, client_ip).into()
    }

    /// Stage 6: double-submit CSRF on state-changing auth API calls, then the
    /// route gate.
    pub fn auth_stage<'a>(
        &'a self,
        req: &Request<Body>,
        resolution: &'a TenantResolution,
        context: &'a mut RequestContext,
    ) -> impl std::future::Future<Output = StageOutcome> + Send + 'a {
        // Extract owned request state up front; the returned future must not
        // borrow the non-`Sync` request body, or it would be `!Send`.
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let headers = req.headers().clone();
        async move {
            if csrf::applies(&method, &path) {
                if let Err(rejection) = csrf::verify(&headers) {
                    tracing::warn!(path = %path, "CSRF token missing or mismatched");
                    return StageOutcome::Terminal(rejection.into_response());
                }
            }

            let decision = self
                .gate
                .check(&headers, &resolution.normalized_path, &resolution.locale)
                .await;

            if decision.user.is_some() {
                context.metadata.is_authenticated = Some(true);
            }
            context.user = decision.user;

            decision.response.into()
        }
    }

    /// Response annotation shared by every exit path: tenant cookies first,
    /// then CORS (API paths), then security headers.
    fn finish(
        &self,
        mut response: Response<Body>,
        request_headers: &HeaderMap,
        resolution: &TenantResolution,
        origin: Option<&HeaderValue>,
        api_path: bool,
        method: &Method,
        started: Instant,
    ) -> Response<Body> {
        annotate_response(request_headers, resolution, &mut response, self.secure_cookies);
        if api_path {
            self.cors.apply(origin, response.headers_mut());
        }
        self.security.apply(response.headers_mut());
        metrics::record_request(method.as_str(), response.status().as_u16(), started);
        response
    }
}

/// Axum middleware entry point.
pub async fn edge_middleware(
    State(pipeline): State<Arc<EdgePipeline>>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip(&req);
    pipeline.handle(req, client_ip, next).await
}

/// Client IP: proxy headers first, then the connection address.
fn client_ip(req: &Request<Body>) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return ip;
            }
        }
    }
    if let Some(real_ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
    {
        if let Ok(ip) = real_ip.trim().parse() {
            return ip;
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
}

/// Mirror the resolution onto request headers for downstream handlers.
fn annotate_request(req: &mut Request<Body>, resolution: &TenantResolution) {
    let headers = req.headers_mut();
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

/// Swap the request path, preserving the query string.
fn rewrite_request_path(req: &mut Request<Body>, new_path: &str) {
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_string(),
    };
    let mut parts = req.uri().clone().into_parts();
    match PathAndQuery::try_from(path_and_query.as_str()) {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            if let Ok(uri) = Uri::from_parts(parts) {
                *req.uri_mut() = uri;
            }
        }
        Err(error) => {
            tracing::warn!(path = %new_path, error = %error, "Skipping malformed rewrite path");
        }
    }
}
