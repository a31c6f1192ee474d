//! CORS policy for API paths.
//!
//! # Design Decisions
//! - Explicit allowlist; the request Origin is reflected only on membership
//! - Non-allowlisted origins fall back to the first allowlist entry, or the
//!   literal "null" — preserved behavior, flagged as a product policy
//!   decision rather than tightened here
//! - Preflights are answered at the edge and never forwarded

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-CSRF-Token, X-Requested-With";

/// True when any path segment is `api`.
pub fn is_api_path(path: &str) -> bool {
    path.split('/').any(|segment| segment == "api")
}

/// Origin allowlist and header application.
#[derive(Clone)]
pub struct CorsPolicy {
    allowlist: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowlist: Vec<String>) -> Self {
        Self { allowlist }
    }

    /// True for an `OPTIONS` request to an API path.
    pub fn is_preflight<B>(req: &Request<B>) -> bool {
        req.method() == Method::OPTIONS && is_api_path(req.uri().path())
    }

    /// Answer a preflight with an empty 204 carrying CORS headers.
    pub fn preflight_response<B>(&self, req: &Request<B>) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        self.apply(req.headers().get(ORIGIN), response.headers_mut());
        response
    }

    /// Apply CORS headers for an API response.
    pub fn apply(&self, request_origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let origin = self.resolve_origin(request_origin);
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    }

    fn resolve_origin(&self, request_origin: Option<&HeaderValue>) -> String {
        if let Some(origin) = request_origin.and_then(|v| v.to_str().ok()) {
            if self.allowlist.iter().any(|allowed| allowed == origin) {
                return origin.to_string();
            }
        }
        self.allowlist
            .first()
            .cloned()
            .unwrap_or_else(|| "null".to_string())
    }
}
