//! Bot classification.
//!
//! Classification sits behind a trait so a remote detection service can
//! replace the built-in user-agent heuristics without touching the guard.

use serde::{Deserialize, Serialize};

/// Coarse bot categories used by the allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotCategory {
    /// Search engine crawlers.
    SearchEngine,
    /// Link preview / unfurl fetchers.
    Preview,
    /// Uptime monitors.
    Monitor,
    /// Generic automated clients (scripts, headless browsers).
    Automated,
}

impl BotCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            BotCategory::SearchEngine => "search_engine",
            BotCategory::Preview => "preview",
            BotCategory::Monitor => "monitor",
            BotCategory::Automated => "automated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "search_engine" => Some(BotCategory::SearchEngine),
            "preview" => Some(BotCategory::Preview),
            "monitor" => Some(BotCategory::Monitor),
            "automated" => Some(BotCategory::Automated),
            _ => None,
        }
    }
}

/// A positive bot classification.
#[derive(Debug, Clone)]
pub struct BotVerdict {
    /// Well-known bot name, e.g. "googlebot".
    pub name: String,
    pub category: BotCategory,
}

/// Classifies a request's user agent.
pub trait BotDetector: Send + Sync {
    /// `None` means "not a bot as far as we can tell".
    fn classify(&self, user_agent: &str) -> Option<BotVerdict>;
}

/// Substring-based user-agent detector.
pub struct UserAgentDetector;

const KNOWN_BOTS: [(&str, BotCategory); 14] = [
    ("googlebot", BotCategory::SearchEngine),
    ("bingbot", BotCategory::SearchEngine),
    ("duckduckbot", BotCategory::SearchEngine),
    ("baiduspider", BotCategory::SearchEngine),
    ("slackbot", BotCategory::Preview),
    ("twitterbot", BotCategory::Preview),
    ("facebookexternalhit", BotCategory::Preview),
    ("discordbot", BotCategory::Preview),
    ("linkedinbot", BotCategory::Preview),
    ("pingdom", BotCategory::Monitor),
    ("uptimerobot", BotCategory::Monitor),
    ("statuscake", BotCategory::Monitor),
    ("curl/", BotCategory::Automated),
    ("python-requests", BotCategory::Automated),
];

impl BotDetector for UserAgentDetector {
    fn classify(&self, user_agent: &str) -> Option<BotVerdict> {
        let ua = user_agent.to_lowercase();
        for (marker, category) in KNOWN_BOTS {
            if ua.contains(marker) {
                return Some(BotVerdict {
                    name: marker.trim_end_matches('/').to_string(),
                    category,
                });
            }
        }
        if ua.contains("headlesschrome") || ua.contains("phantomjs") {
            return Some(BotVerdict {
                name: "headless".to_string(),
                category: BotCategory::Automated,
            });
        }
        None
    }
}
