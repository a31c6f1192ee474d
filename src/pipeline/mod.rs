//! The composed request-edge pipeline: per-request context, stage outcomes,
//! and the ordered composer.

pub mod composer;
pub mod context;

pub use composer::{edge_middleware, EdgePipeline, StageOutcome};
pub use context::{RequestContext, RequestMetadata};
