//! Multi-Tenant Edge Gateway (v1)
//!
//! Runs the request-edge pipeline in front of a minimal downstream
//! application:
//!
//! ```text
//!   Client ──▶ trace ──▶ timeout ──▶ edge pipeline ──▶ downstream router
//!                                       │
//!                                       ├─ tenant resolution (+TTL cache)
//!                                       ├─ CORS preflight short-circuit
//!                                       ├─ path rewrite + annotation
//!                                       ├─ bot / rate-limit guard
//!                                       ├─ CSRF + auth gate
//!                                       └─ cookie + security-header stamping
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::config::{load_config, GatewayConfig};
use edge_gateway::http::GatewayServer;
use edge_gateway::observability::metrics;
use edge_gateway::pipeline::RequestContext;
use edge_gateway::tenant::types::{TenantRecord, TenantStatus};
use edge_gateway::tenant::{InMemoryTenantStore, TenantResolution};

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", about = "Multi-tenant request-edge gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        auth_provider = ?config.auth.provider,
        default_tenant = %config.tenants.default_slug,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Seed the in-memory tenant store from config. Real deployments implement
    // `TenantStore` against their database instead.
    let store = Arc::new(InMemoryTenantStore::new());
    for seed in &config.tenants.seed {
        store.insert(TenantRecord {
            id: None,
            slug: seed.slug.to_lowercase(),
            default_locale: seed.default_locale.clone(),
            status: TenantStatus::Active,
        });
        if let Some(domain) = &seed.domain {
            store.map_domain(domain, &seed.slug);
        }
        tracing::info!(slug = %seed.slug, domain = ?seed.domain, "Seeded tenant");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config, store, downstream_router())?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Minimal downstream application: health probe plus a tenant-echo fallback.
fn downstream_router() -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .fallback(echo_handler)
}

/// Echo the pipeline's resolution, standing in for a rendering layer.
async fn echo_handler(
    Extension(resolution): Extension<TenantResolution>,
    Extension(context): Extension<RequestContext>,
) -> Json<serde_json::Value> {
    Json(json!({
        "tenant": resolution.tenant.slug,
        "locale": resolution.locale,
        "source": resolution.source.as_str(),
        "path": resolution.normalized_path,
        "authenticated": context.metadata.is_authenticated,
    }))
}
