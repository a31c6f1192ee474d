//! Bounded-TTL cache for tenant lookups.
//!
//! Negative results are cached too, so a hostname or slug that resolves to
//! nothing is not re-queried until its entry expires. Eviction is lazy: an
//! expired entry is removed when it is next read. Entries are cheap and
//! bounded by the number of distinct tenants and domains.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;
use crate::tenant::types::TenantRecord;

struct CacheEntry {
    value: Option<TenantRecord>,
    expires_at: Instant,
}

/// Shared tenant lookup cache.
///
/// Keys are `"slug:<lowercase>"` or `"domain:<lowercase-host>"`. Safe for
/// concurrent use from in-flight requests.
pub struct TenantCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TenantCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn slug_key(slug: &str) -> String {
        format!("slug:{}", slug.to_lowercase())
    }

    pub fn domain_key(host: &str) -> String {
        format!("domain:{}", host.to_lowercase())
    }

    /// Look up a cached result.
    ///
    /// Outer `None` means "not cached, ask the store"; `Some(None)` is a
    /// cached negative result. An entry past its expiry is treated as absent
    /// and removed.
    pub fn get(&self, key: &str) -> Option<Option<TenantRecord>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                metrics::record_tenant_cache("hit");
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        metrics::record_tenant_cache("miss");
        None
    }

    /// Cache a lookup result (positive or negative).
    pub fn insert(&self, key: String, value: Option<TenantRecord>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(slug: &str) -> TenantRecord {
        TenantRecord::synthetic_default(slug, "en")
    }

    #[test]
    fn caches_positive_and_negative_results() {
        let cache = TenantCache::new(Duration::from_secs(60));
        cache.insert(TenantCache::slug_key("acme"), Some(record("acme")));
        cache.insert(TenantCache::domain_key("gone.io"), None);

        let hit = cache.get(&TenantCache::slug_key("acme")).unwrap();
        assert_eq!(hit.unwrap().slug, "acme");

        // Negative entry is present, distinct from "not cached".
        let negative = cache.get(&TenantCache::domain_key("gone.io"));
        assert_eq!(negative, Some(None));
        assert_eq!(cache.get(&TenantCache::slug_key("globex")), None);
    }

    #[test]
    fn expired_entries_are_removed_on_read() {
        let cache = TenantCache::new(Duration::ZERO);
        cache.insert(TenantCache::slug_key("acme"), Some(record("acme")));
        assert_eq!(cache.get(&TenantCache::slug_key("acme")), None);
        assert_eq!(cache.len(), 0);
    }
}
