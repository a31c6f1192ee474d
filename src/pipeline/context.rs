//! Per-request context handed to downstream handlers.

use std::collections::HashMap;
use std::time::Instant;

use crate::auth::adapter::UserSummary;

/// Request metadata accumulated by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub is_bot: Option<bool>,
    pub is_authenticated: Option<bool>,
    pub locale: Option<String>,
    pub pathname: Option<String>,
}

/// Created at pipeline entry, inserted into request extensions, discarded at
/// pipeline exit. Never shared across requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub started_at: Instant,
    pub user: Option<UserSummary>,
    pub metadata: RequestMetadata,

    /// Open key/value bag for inter-component handoff.
    pub bag: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            user: None,
            metadata: RequestMetadata::default(),
            bag: HashMap::new(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
