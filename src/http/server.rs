//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the configured auth adapter and the edge pipeline
//! - Wrap the caller's downstream router with the pipeline and tower layers
//! - Mount the test-auth routes when the test provider is active
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use cookie::SameSite;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::adapter::{AuthError, RouteGuardConfig};
use crate::auth::csrf;
use crate::auth::providers::{build_adapter, TestAdapter};
use crate::auth::providers::test::TEST_SESSION_COOKIE;
use crate::auth::rate_limit::{throttle_response, AuthOperation, AuthRateLimiter};
use crate::config::schema::GatewayConfig;
use crate::http::cookies::set_cookie;
use crate::pipeline::composer::{edge_middleware, EdgePipeline};
use crate::tenant::store::TenantStore;

/// HTTP server for the edge gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Wrap `downstream` with the pipeline. Fails when the configured auth
    /// provider cannot be constructed.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn TenantStore>,
        downstream: Router,
    ) -> Result<Self, AuthError> {
        let built = build_adapter(&config.auth, config.environment)?;
        let pipeline = Arc::new(EdgePipeline::new(&config, store, built.adapter.clone()));

        let mut app = downstream;
        if let Some(test_adapter) = built.test {
            app = app.merge(test_auth_router(test_adapter, &config));
        }

        let router = app
            .layer(middleware::from_fn_with_state(pipeline, edge_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http());

        Ok(Self { router, config })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Edge gateway starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Edge gateway stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The wrapped router, for driving the server in tests without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

// ---------------------------------------------------------------------------
// Test-auth routes (test provider only)
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct TestAuthState {
    adapter: Arc<TestAdapter>,
    limiter: Arc<AuthRateLimiter>,
    routes: Arc<RouteGuardConfig>,
    secure_cookies: bool,
}

/// End-to-end testing routes backed by the test adapter's shared maps.
/// Mounted only when the configured provider is `test`; the factory refuses
/// to build that adapter in production.
fn test_auth_router(adapter: Arc<TestAdapter>, config: &GatewayConfig) -> Router {
    let state = TestAuthState {
        adapter,
        limiter: Arc::new(AuthRateLimiter::new(config.auth.rate_limits.clone())),
        routes: Arc::new(RouteGuardConfig::from(&config.auth)),
        secure_cookies: config.environment.is_production(),
    };

    Router::new()
        .route("/api/auth/csrf", get(issue_csrf))
        .route("/api/auth/users", post(create_user))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(current_session))
        .with_state(state)
}

/// Issue CSRF token material: cookie plus body copy for the header echo.
async fn issue_csrf() -> Response<Body> {
    let token = csrf::issue_token();
    let mut response = Json(json!({"token": token})).into_response();
    csrf::attach_token(response.headers_mut(), &token);
    response
}

#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    #[serde(default)]
    role: Option<String>,
}

async fn create_user(
    State(state): State<TestAuthState>,
    Json(body): Json<CreateUserRequest>,
) -> Response<Body> {
    let user = state.adapter.create_user(&body.email, body.role.as_deref());
    (StatusCode::CREATED, Json(user)).into_response()
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
}

async fn sign_in(
    State(state): State<TestAuthState>,
    Json(body): Json<SignInRequest>,
) -> Response<Body> {
    let decision = state.limiter.check(AuthOperation::SignIn, &body.email);
    if !decision.success {
        return throttle_response(&decision);
    }

    let user = match state.adapter.find_user_by_email(&body.email) {
        Some(user) => user,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unknown user"})),
            )
                .into_response();
        }
    };

    // Checked for existence just above.
    let session_id = state
        .adapter
        .create_session(&user.id)
        .unwrap_or_default();

    let mut response = Json(json!({"user": user})).into_response();
    set_cookie(
        response.headers_mut(),
        TEST_SESSION_COOKIE,
        &session_id,
        SameSite::Lax,
        state.secure_cookies,
    );
    response
}

async fn sign_out(State(state): State<TestAuthState>, headers: HeaderMap) -> Response<Body> {
    use crate::auth::adapter::AuthAdapter;

    if let Ok(Some(session)) = state.adapter.session(&headers).await {
        state.adapter.destroy_session(&session.id);
    }
    state
        .adapter
        .sign_out(&state.routes)
        .await
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn current_session(State(state): State<TestAuthState>, headers: HeaderMap) -> Response<Body> {
    use crate::auth::adapter::AuthAdapter;

    match state.adapter.current_user(&headers).await {
        Ok(Some(user)) => Json(json!({"user": user})).into_response(),
        Ok(None) => Json(json!({"user": null})).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
