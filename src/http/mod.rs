//! HTTP server wiring and cookie utilities.

pub mod cookies;
pub mod server;

pub use server::GatewayServer;
