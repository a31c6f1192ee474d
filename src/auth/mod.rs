//! Authentication: provider adapters, the route gate, CSRF protection, and
//! the auth-operation rate limiter.

pub mod adapter;
pub mod csrf;
pub mod gate;
pub mod providers;
pub mod rate_limit;

pub use adapter::{
    AuthAdapter, AuthError, GateDecision, RouteGuardConfig, SessionInfo, UserSummary,
};
pub use gate::AuthGate;
pub use providers::{build_adapter, BuiltAdapter, TestAdapter};
pub use rate_limit::{AuthOperation, AuthRateLimiter, RateLimitDecision};
