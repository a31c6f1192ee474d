//! Bot detection and API rate limiting.

pub mod bot;
pub mod guard;
pub mod rate_limit;

pub use bot::{BotCategory, BotDetector, BotVerdict, UserAgentDetector};
pub use guard::AbuseGuard;
pub use rate_limit::{parse_interval, ApiRateLimiter};
