//! Bot and rate-limit guard.
//!
//! Both checks require a detection API key; without one the guard is a
//! deliberate no-op. The gate is advisory, not a hard security boundary, so
//! failing open is acceptable — the skip is logged so misconfiguration stays
//! visible.

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{RETRY_AFTER, USER_AGENT};
use axum::http::{HeaderValue, Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::config::schema::{AbuseConfig, BotRuleMode, Environment};
use crate::observability::metrics;
use crate::security::cors::is_api_path;

use super::bot::{BotCategory, BotDetector, UserAgentDetector};
use super::rate_limit::ApiRateLimiter;

/// Evaluates the bot rule and, for state-changing API calls, the token
/// bucket. Returns a terminal deny response or `None` (continue).
pub struct AbuseGuard {
    enabled: bool,
    mode: BotRuleMode,
    allowed_categories: Vec<BotCategory>,
    detector: Arc<dyn BotDetector>,
    limiter: ApiRateLimiter,
    retry_after_secs: u64,
}

impl AbuseGuard {
    pub fn from_config(config: &AbuseConfig, environment: Environment) -> Self {
        Self::with_detector(config, environment, Arc::new(UserAgentDetector))
    }

    pub fn with_detector(
        config: &AbuseConfig,
        environment: Environment,
        detector: Arc<dyn BotDetector>,
    ) -> Self {
        let mode = config.mode.unwrap_or(if environment.is_production() {
            BotRuleMode::Live
        } else {
            BotRuleMode::DryRun
        });

        let allowed_categories = config
            .allowed_bot_categories
            .iter()
            .filter_map(|name| {
                let parsed = BotCategory::parse(name);
                if parsed.is_none() {
                    tracing::warn!(category = %name, "Unknown bot category in allowlist, ignoring");
                }
                parsed
            })
            .collect();

        let limiter = ApiRateLimiter::new(config.refill_rate, &config.interval, config.capacity);
        let retry_after_secs = config
            .retry_after_secs
            .unwrap_or_else(|| limiter.interval().as_secs());

        Self {
            enabled: config.api_key.is_some(),
            mode,
            allowed_categories,
            detector,
            limiter,
            retry_after_secs,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Run both checks. `None` means continue.
    pub fn check<B>(&self, req: &Request<B>, client_ip: IpAddr) -> Option<Response<Body>> {
        if !self.enabled {
            tracing::debug!("Abuse detection not configured, skipping");
            return None;
        }

        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if let Some(verdict) = self.detector.classify(user_agent) {
            if !self.allowed_categories.contains(&verdict.category) {
                match self.mode {
                    BotRuleMode::Live => {
                        tracing::warn!(
                            bot = %verdict.name,
                            category = verdict.category.as_str(),
                            "Denying bot request"
                        );
                        metrics::record_abuse_denied("bot");
                        return Some(
                            (StatusCode::FORBIDDEN, Json(json!({"error": "Forbidden"})))
                                .into_response(),
                        );
                    }
                    BotRuleMode::DryRun => {
                        tracing::warn!(
                            bot = %verdict.name,
                            category = verdict.category.as_str(),
                            "Bot rule violation (dry run, not denied)"
                        );
                    }
                }
            }
        }

        if is_state_changing(req.method()) && is_api_path(req.uri().path()) {
            let key = ApiRateLimiter::client_key(client_ip, user_agent);
            if !self.limiter.try_acquire(&key) {
                tracing::warn!(client = %client_ip, "API rate limit exceeded");
                metrics::record_abuse_denied("rate_limit");
                return Some(self.throttle_response());
            }
        }

        None
    }

    fn throttle_response(&self) -> Response<Body> {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Too many requests"})),
        )
            .into_response();

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.retry_after_secs.to_string()) {
            headers.insert(RETRY_AFTER, value.clone());
            headers.insert("x-ratelimit-reset", value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.limiter.capacity().to_string()) {
            headers.insert("x-ratelimit-limit", value);
        }
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        response
    }
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
