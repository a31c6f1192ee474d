//! Double-submit cookie CSRF protection for state-changing auth API calls.
//!
//! The token lives in a `__Host`-scoped HttpOnly cookie and must be echoed
//! back in the `x-csrf-token` header. Comparison is constant-time. Missing or
//! mismatched tokens fail closed.

use axum::body::Body;
use axum::http::{HeaderMap, Method, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use cookie::SameSite;
use rand::RngCore;
use serde_json::json;

use crate::http::cookies::{request_cookie, set_cookie};
use crate::security::cors::is_api_path;

pub const CSRF_COOKIE: &str = "__Host-csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// CSRF verification failure, rendered as a 403.
#[derive(Debug, PartialEq, Eq)]
pub struct CsrfRejection;

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response<Body> {
        (
            StatusCode::FORBIDDEN,
            Json(json!({"code": "CSRF_TOKEN_INVALID"})),
        )
            .into_response()
    }
}

/// True for the calls the double-submit check covers: state-changing methods
/// on auth API paths.
pub fn applies(method: &Method, path: &str) -> bool {
    let state_changing = matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    state_changing && is_api_path(path) && path.split('/').any(|segment| segment == "auth")
}

/// Generate fresh token material.
pub fn issue_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Attach the token cookie. `__Host-` prefixed cookies are always Secure,
/// path `/`, and carry no Domain attribute.
pub fn attach_token(headers: &mut HeaderMap, token: &str) {
    set_cookie(headers, CSRF_COOKIE, token, SameSite::Strict, true);
}

/// Verify the double-submit pair on a request.
pub fn verify(headers: &HeaderMap) -> Result<(), CsrfRejection> {
    let cookie_token = request_cookie(headers, CSRF_COOKIE).ok_or(CsrfRejection)?;
    let header_token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(CsrfRejection)?;

    if constant_time_compare(cookie_token.as_bytes(), header_token.as_bytes()) {
        Ok(())
    } else {
        Err(CsrfRejection)
    }
}

/// Byte comparison without early exit on the first mismatch.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
