//! Multi-Tenant Edge Gateway Library
//!
//! A per-request resolution and decoration pipeline that determines which
//! tenant, locale, and authentication state applies to an incoming request
//! before any downstream handler runs, composing tenant routing, CORS,
//! bot/rate-limit defense, auth gating, and security headers into one
//! ordered pass.

pub mod abuse;
pub mod auth;
pub mod config;
pub mod http;
pub mod i18n;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod tenant;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use pipeline::EdgePipeline;
pub use tenant::TenantResolver;
