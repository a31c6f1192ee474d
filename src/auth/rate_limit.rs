//! Sliding-window rate limiting for authentication operations.
//!
//! Distinct from the API token bucket: each `operation:identifier` pair keeps
//! an ordered list of attempt timestamps. Attempts outside the window are
//! pruned before a new one is evaluated; exceeding the maximum sets a block
//! that denies everything until it elapses.

use std::time::{Duration, Instant, SystemTime};

use axum::body::Body;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dashmap::DashMap;
use serde_json::json;

use crate::config::schema::{AuthRateLimitsConfig, WindowPolicyConfig};
use crate::observability::metrics;

/// Rate-limited authentication operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOperation {
    SignIn,
    SignUp,
    PasswordReset,
    Mfa,
    OauthCallback,
}

impl AuthOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthOperation::SignIn => "sign_in",
            AuthOperation::SignUp => "sign_up",
            AuthOperation::PasswordReset => "password_reset",
            AuthOperation::Mfa => "mfa",
            AuthOperation::OauthCallback => "oauth_callback",
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub success: bool,
    pub remaining: u32,
    pub reset_at: SystemTime,
    pub blocked: bool,
}

impl RateLimitDecision {
    /// Seconds until the window or block resets, for Retry-After.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_at
            .duration_since(SystemTime::now())
            .map(|d| d.as_secs().max(1))
            .unwrap_or(1)
    }
}

#[derive(Default)]
struct WindowRecord {
    attempts: Vec<Instant>,
    blocked_until: Option<Instant>,
}

/// Per-operation sliding-window limiter.
pub struct AuthRateLimiter {
    records: DashMap<String, WindowRecord>,
    policies: AuthRateLimitsConfig,
}

impl AuthRateLimiter {
    pub fn new(policies: AuthRateLimitsConfig) -> Self {
        Self {
            records: DashMap::new(),
            policies,
        }
    }

    fn policy(&self, operation: AuthOperation) -> WindowPolicyConfig {
        match operation {
            AuthOperation::SignIn => self.policies.sign_in,
            AuthOperation::SignUp => self.policies.sign_up,
            AuthOperation::PasswordReset => self.policies.password_reset,
            AuthOperation::Mfa => self.policies.mfa,
            AuthOperation::OauthCallback => self.policies.oauth_callback,
        }
    }

    /// Record and evaluate one attempt.
    pub fn check(&self, operation: AuthOperation, identifier: &str) -> RateLimitDecision {
        let policy = self.policy(operation);
        let window = Duration::from_secs(policy.window_secs);
        let block = Duration::from_secs(policy.block_secs);
        let now = Instant::now();
        let key = format!("auth:{}:{}", operation.as_str(), identifier);

        let mut record = self.records.entry(key).or_default();

        if let Some(until) = record.blocked_until {
            if until > now {
                return RateLimitDecision {
                    success: false,
                    remaining: 0,
                    reset_at: SystemTime::now() + (until - now),
                    blocked: true,
                };
            }
            // Block elapsed; start a fresh window.
            record.blocked_until = None;
            record.attempts.clear();
        }

        record.attempts.retain(|t| now.duration_since(*t) < window);
        record.attempts.push(now);

        let count = record.attempts.len() as u32;
        if count > policy.max_attempts {
            record.blocked_until = Some(now + block);
            tracing::warn!(
                operation = operation.as_str(),
                identifier = %identifier,
                attempts = count,
                "Auth rate limit exceeded, blocking"
            );
            metrics::record_rate_limited("auth");
            return RateLimitDecision {
                success: false,
                remaining: 0,
                reset_at: SystemTime::now() + block,
                blocked: true,
            };
        }

        let oldest = record.attempts.first().copied().unwrap_or(now);
        RateLimitDecision {
            success: true,
            remaining: policy.max_attempts - count,
            reset_at: SystemTime::now() + (window - now.duration_since(oldest)),
            blocked: false,
        }
    }
}

/// Render a blocked decision as a 429 with Retry-After.
pub fn throttle_response(decision: &RateLimitDecision) -> Response<Body> {
    let retry_after = decision.retry_after_secs();
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Too many requests",
            "blocked": decision.blocked,
            "retryAfter": retry_after,
        })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_with(sign_in: WindowPolicyConfig) -> AuthRateLimiter {
        let mut policies = AuthRateLimitsConfig::default();
        policies.sign_in = sign_in;
        AuthRateLimiter::new(policies)
    }

    #[test]
    fn attempts_within_limit_succeed_and_count_down() {
        let limiter = limiter_with(WindowPolicyConfig::new(5, 900, 900));
        for expected_remaining in (0..5).rev() {
            let decision = limiter.check(AuthOperation::SignIn, "user@example.com");
            assert!(decision.success);
            assert!(!decision.blocked);
            assert_eq!(decision.remaining, expected_remaining);
        }
    }

    #[test]
    fn sixth_attempt_blocks_with_future_reset() {
        let limiter = limiter_with(WindowPolicyConfig::new(5, 900, 900));
        for _ in 0..5 {
            assert!(limiter.check(AuthOperation::SignIn, "user@example.com").success);
        }
        let decision = limiter.check(AuthOperation::SignIn, "user@example.com");
        assert!(!decision.success);
        assert!(decision.blocked);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_at > SystemTime::now());

        // Still blocked on the next attempt.
        let decision = limiter.check(AuthOperation::SignIn, "user@example.com");
        assert!(decision.blocked);
    }

    #[test]
    fn attempts_succeed_again_after_block_elapses() {
        let limiter = limiter_with(WindowPolicyConfig::new(1, 1, 1));
        assert!(limiter.check(AuthOperation::SignIn, "user@example.com").success);
        let blocked = limiter.check(AuthOperation::SignIn, "user@example.com");
        assert!(blocked.blocked);

        std::thread::sleep(Duration::from_millis(1100));
        let decision = limiter.check(AuthOperation::SignIn, "user@example.com");
        assert!(decision.success);
    }

    #[test]
    fn identifiers_and_operations_are_isolated() {
        let limiter = limiter_with(WindowPolicyConfig::new(1, 900, 900));
        assert!(limiter.check(AuthOperation::SignIn, "a@example.com").success);
        assert!(limiter.check(AuthOperation::SignIn, "b@example.com").success);
        assert!(limiter.check(AuthOperation::SignUp, "a@example.com").success);
        assert!(limiter.check(AuthOperation::SignIn, "a@example.com").blocked);
    }

    #[test]
    fn old_attempts_are_pruned_from_the_window() {
        let limiter = limiter_with(WindowPolicyConfig::new(2, 1, 900));
        assert!(limiter.check(AuthOperation::SignIn, "user").success);
        assert!(limiter.check(AuthOperation::SignIn, "user").success);
        std::thread::sleep(Duration::from_millis(1100));
        // The earlier attempts have aged out; no block.
        let decision = limiter.check(AuthOperation::SignIn, "user");
        assert!(decision.success);
    }

    #[test]
    fn throttle_response_carries_retry_after() {
        let limiter = limiter_with(WindowPolicyConfig::new(1, 900, 900));
        limiter.check(AuthOperation::SignIn, "user");
        let decision = limiter.check(AuthOperation::SignIn, "user");
        let response = throttle_response(&decision);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = response
            .headers()
            .get(RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry >= 1 && retry <= 900);
    }
}
