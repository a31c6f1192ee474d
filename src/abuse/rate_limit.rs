//! Token-bucket rate limiting for state-changing API requests.

use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Parse a duration string: `"60s"`, `"5m"`, `"2h"`, `"1d"`.
///
/// Malformed input falls back to 60 seconds rather than erroring; a broken
/// config value must not take the limiter down.
pub fn parse_interval(value: &str) -> Duration {
    let value = value.trim();
    let Some(last) = value.chars().last() else {
        return DEFAULT_INTERVAL;
    };
    let (digits, multiplier) = match last {
        's' => (&value[..value.len() - 1], 1),
        'm' => (&value[..value.len() - 1], 60),
        'h' => (&value[..value.len() - 1], 3600),
        'd' => (&value[..value.len() - 1], 86_400),
        _ => return DEFAULT_INTERVAL,
    };
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Duration::from_secs(n * multiplier),
        _ => DEFAULT_INTERVAL,
    }
}

/// A single token bucket.
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_per_sec: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-client token buckets keyed by IP + user-agent fingerprint.
pub struct ApiRateLimiter {
    buckets: DashMap<String, TokenBucket>,
    capacity: f64,
    refill_per_sec: f64,
    interval: Duration,
}

impl ApiRateLimiter {
    pub fn new(refill_rate: u32, interval: &str, capacity: u32) -> Self {
        let interval = parse_interval(interval);
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(capacity),
            refill_per_sec: f64::from(refill_rate) / interval.as_secs_f64(),
            interval,
        }
    }

    /// Consume one token for the client; false when the bucket is empty.
    pub fn try_acquire(&self, key: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity));
        bucket.try_acquire(self.capacity, self.refill_per_sec)
    }

    /// Refill interval, used to derive Retry-After.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    /// Bucket key: client IP plus a stable user-agent fingerprint.
    pub fn client_key(ip: IpAddr, user_agent: &str) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        user_agent.hash(&mut hasher);
        format!("{}:{:016x}", ip, hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_suffixes() {
        assert_eq!(parse_interval("60s"), Duration::from_secs(60));
        assert_eq!(parse_interval("5m"), Duration::from_secs(300));
        assert_eq!(parse_interval("2h"), Duration::from_secs(7200));
        assert_eq!(parse_interval("1d"), Duration::from_secs(86_400));
    }

    #[test]
    fn malformed_interval_falls_back() {
        assert_eq!(parse_interval(""), DEFAULT_INTERVAL);
        assert_eq!(parse_interval("banana"), DEFAULT_INTERVAL);
        assert_eq!(parse_interval("0s"), DEFAULT_INTERVAL);
        assert_eq!(parse_interval("5w"), DEFAULT_INTERVAL);
    }

    #[test]
    fn bucket_exhausts_at_capacity() {
        let limiter = ApiRateLimiter::new(60, "60s", 3);
        let key = "client";
        assert!(limiter.try_acquire(key));
        assert!(limiter.try_acquire(key));
        assert!(limiter.try_acquire(key));
        assert!(!limiter.try_acquire(key));
    }

    #[test]
    fn buckets_are_isolated_per_key() {
        let limiter = ApiRateLimiter::new(60, "60s", 1);
        assert!(limiter.try_acquire("a"));
        assert!(!limiter.try_acquire("a"));
        assert!(limiter.try_acquire("b"));
    }

    #[test]
    fn client_key_is_stable_and_ua_sensitive() {
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let a = ApiRateLimiter::client_key(ip, "Mozilla/5.0");
        let b = ApiRateLimiter::client_key(ip, "Mozilla/5.0");
        let c = ApiRateLimiter::client_key(ip, "curl/8.4.0");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
