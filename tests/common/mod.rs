//! Shared helpers for integration tests.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::Extension;
use axum::http::header::SET_COOKIE;
use axum::http::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use edge_gateway::config::GatewayConfig;
use edge_gateway::http::GatewayServer;
use edge_gateway::tenant::types::TenantRecord;
use edge_gateway::tenant::{InMemoryTenantStore, TenantResolution};

/// acme (default locale fr, custom domain app.acme.io) and globex (en).
pub fn seeded_store() -> Arc<InMemoryTenantStore> {
    let store = InMemoryTenantStore::new();
    store.insert(TenantRecord::synthetic_default("acme", "fr"));
    store.insert(TenantRecord::synthetic_default("globex", "en"));
    store.map_domain("app.acme.io", "acme");
    Arc::new(store)
}

/// Downstream application standing in for the rendering layer.
pub fn downstream() -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/echo", post(|| async { Json(json!({"ok": true})) }))
        .fallback(echo)
}

async fn echo(Extension(resolution): Extension<TenantResolution>) -> Json<Value> {
    Json(json!({
        "tenant": resolution.tenant.slug,
        "locale": resolution.locale,
        "source": resolution.source.as_str(),
        "path": resolution.normalized_path,
    }))
}

/// The gateway router wrapped around the test downstream.
pub fn app(config: GatewayConfig) -> Router {
    GatewayServer::new(config, seeded_store(), downstream())
        .expect("gateway should build")
        .into_router()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// All Set-Cookie values on a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `name=value` pair of a named response cookie.
pub fn cookie_pair(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .and_then(|c| c.split(';').next().map(str::to_string))
}
