//! Security hardening: CSP construction, fixed response headers, CORS.

pub mod cors;
pub mod csp;
pub mod headers;

pub use cors::{is_api_path, CorsPolicy};
pub use headers::SecurityHeaders;
