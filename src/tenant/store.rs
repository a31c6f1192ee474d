//! Tenant lookup store boundary.
//!
//! The gateway does not own tenant persistence. It consumes lookups through
//! `TenantStore`, which concrete deployments back with their database. The
//! in-memory implementation here serves tests and single-node setups.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::tenant::types::TenantRecord;

/// Error from a tenant store lookup.
///
/// `RelationMissing` must be distinguishable from generic failure: an
/// unmigrated schema or test database is recovered as "no tenant," while any
/// other failure propagates and fails the request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tenant relation missing: {0}")]
    RelationMissing(String),

    #[error("tenant store error: {0}")]
    Backend(String),
}

/// Asynchronous tenant lookup interface.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>, StoreError>;

    async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, StoreError>;
}

/// In-memory tenant store.
#[derive(Default)]
pub struct InMemoryTenantStore {
    by_slug: DashMap<String, TenantRecord>,
    domain_to_slug: DashMap<String, String>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant, keyed by its lowercase slug.
    pub fn insert(&self, record: TenantRecord) {
        self.by_slug.insert(record.slug.to_lowercase(), record);
    }

    /// Bind a custom domain to a tenant slug.
    pub fn map_domain(&self, domain: &str, slug: &str) {
        self.domain_to_slug
            .insert(domain.to_lowercase(), slug.to_lowercase());
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>, StoreError> {
        Ok(self
            .by_slug
            .get(&slug.to_lowercase())
            .map(|r| r.value().clone()))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, StoreError> {
        let slug = match self.domain_to_slug.get(&domain.to_lowercase()) {
            Some(s) => s.value().clone(),
            None => return Ok(None),
        };
        self.find_by_slug(&slug).await
    }
}
