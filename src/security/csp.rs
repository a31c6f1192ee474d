//! Content-Security-Policy construction.
//!
//! The policy is a deterministic join of named directives in a fixed order,
//! so repeated application produces byte-identical headers. Each directive is
//! seeded with safe defaults and conditionally extended from configuration.

use url::Url;

use crate::config::schema::{AuthConfig, SecurityConfig};

/// Fixed directive order. Changing it changes the emitted header, so it is
/// part of the contract.
const DIRECTIVE_ORDER: [&str; 11] = [
    "default-src",
    "script-src",
    "style-src",
    "img-src",
    "font-src",
    "connect-src",
    "frame-src",
    "frame-ancestors",
    "base-uri",
    "form-action",
    "object-src",
];

/// Known Clerk frontend domains, appended when a publishable key is set.
const CLERK_SCRIPT_SOURCES: [&str; 2] = [
    "https://*.clerk.accounts.dev",
    "https://challenges.cloudflare.com",
];
const CLERK_CONNECT_SOURCES: [&str; 2] = ["https://*.clerk.accounts.dev", "https://api.clerk.com"];
const CLERK_FRAME_SOURCES: [&str; 1] = ["https://challenges.cloudflare.com"];

/// Build the policy string from configuration.
pub fn build_csp(security: &SecurityConfig, auth: &AuthConfig) -> String {
    let mut directives: Vec<(&str, Vec<String>)> = DIRECTIVE_ORDER
        .iter()
        .map(|name| (*name, seed_sources(name)))
        .collect();

    if auth.clerk.publishable_key.is_some() {
        extend(&mut directives, "script-src", &CLERK_SCRIPT_SOURCES);
        extend(&mut directives, "connect-src", &CLERK_CONNECT_SOURCES);
        extend(&mut directives, "frame-src", &CLERK_FRAME_SOURCES);
    }

    if let Some(origin) = security
        .error_monitoring_dsn
        .as_deref()
        .and_then(parse_origin)
    {
        extend_owned(&mut directives, "connect-src", origin);
    }

    if let Some(origin) = security.analytics_host.as_deref().and_then(parse_origin) {
        extend_owned(&mut directives, "connect-src", origin.clone());
        extend_owned(&mut directives, "script-src", origin);
    }

    directives
        .iter()
        .map(|(name, sources)| format!("{} {}", name, sources.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn seed_sources(directive: &str) -> Vec<String> {
    let seeds: &[&str] = match directive {
        "img-src" => &["'self'", "data:", "blob:"],
        "connect-src" => &["'self'", "wss:"],
        "frame-ancestors" => &["'none'"],
        "object-src" => &["'none'"],
        _ => &["'self'"],
    };
    seeds.iter().map(|s| s.to_string()).collect()
}

fn extend(directives: &mut [(&str, Vec<String>)], name: &str, sources: &[&str]) {
    for source in sources {
        extend_owned(directives, name, source.to_string());
    }
}

fn extend_owned(directives: &mut [(&str, Vec<String>)], name: &str, source: String) {
    if let Some((_, sources)) = directives.iter_mut().find(|(n, _)| *n == name) {
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
}

/// Reduce a configured endpoint to a scheme://host[:port] origin. Bare hosts
/// are assumed https.
fn parse_origin(configured: &str) -> Option<String> {
    let candidate = if configured.contains("://") {
        configured.to_string()
    } else {
        format!("https://{configured}")
    };
    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}
