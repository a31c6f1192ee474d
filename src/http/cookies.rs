//! Request cookie parsing and `Set-Cookie` construction.
//!
//! All gateway-issued cookies are HttpOnly with path `/`; Secure is added in
//! production. SameSite varies by cookie (Lax for tenant cookies, Strict for
//! the CSRF token), so callers pass it explicitly.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};

/// Read a named cookie from the request headers.
pub fn request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for cookie in Cookie::split_parse(raw).flatten() {
        if cookie.name() == name {
            return Some(cookie.value().to_string());
        }
    }
    None
}

/// Append a gateway cookie to the response headers.
pub fn set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    same_site: SameSite,
    secure: bool,
) {
    let cookie = Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .same_site(same_site)
        .secure(secure)
        .build();

    if let Ok(header) = HeaderValue::from_str(&cookie.to_string()) {
        headers.append(SET_COOKIE, header);
    }
}

/// Append an expired cookie, instructing the client to delete it.
pub fn remove_cookie(headers: &mut HeaderMap, name: &str) {
    let cookie = Cookie::build((name.to_string(), String::new()))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .build();

    if let Ok(header) = HeaderValue::from_str(&cookie.to_string()) {
        headers.append(SET_COOKIE, header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("tenant_slug=acme; tenant_locale=fr"),
        );
        assert_eq!(
            request_cookie(&headers, "tenant_slug").as_deref(),
            Some("acme")
        );
        assert_eq!(
            request_cookie(&headers, "tenant_locale").as_deref(),
            Some("fr")
        );
        assert!(request_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn set_cookie_carries_attributes() {
        let mut headers = HeaderMap::new();
        set_cookie(&mut headers, "tenant_slug", "acme", SameSite::Lax, true);
        let value = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.contains("tenant_slug=acme"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Secure"));
        assert!(value.contains("Path=/"));
    }

    #[test]
    fn remove_cookie_expires_immediately() {
        let mut headers = HeaderMap::new();
        remove_cookie(&mut headers, "tenant_domain");
        let value = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.contains("tenant_domain="));
        assert!(value.contains("Max-Age=0"));
    }
}
