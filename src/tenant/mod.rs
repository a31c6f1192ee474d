//! Tenant identity: records, lookup store, TTL cache, and the per-request
//! resolver.

pub mod cache;
pub mod resolver;
pub mod store;
pub mod types;

pub use cache::TenantCache;
pub use resolver::{annotate_response, TenantResolver};
pub use store::{InMemoryTenantStore, StoreError, TenantStore};
pub use types::{TenantRecord, TenantResolution, TenantSource, TenantStatus};
