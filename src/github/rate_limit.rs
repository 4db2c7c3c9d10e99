//! Rate-limit header parsing.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Resource name GitHub reports for the REST API quota.
pub const CORE_RESOURCE: &str = "core";

/// Most recently observed quota state for one GitHub resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub resource: String,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the window resets.
    pub reset: i64,
    #[serde(rename = "checkedAt")]
    pub checked_at: DateTime<Utc>,
}

impl RateLimitInfo {
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or(self.checked_at)
    }

    /// True when the window has not reset yet as of `now`.
    pub fn reset_pending(&self, now: DateTime<Utc>) -> bool {
        self.reset > now.timestamp()
    }

    /// Admission predicate: quota at or below `floor` and not yet reset.
    pub fn blocks_run(&self, floor: u32, now: DateTime<Utc>) -> bool {
        self.remaining <= floor && self.reset_pending(now)
    }
}

/// Parse `x-ratelimit-*` headers.
///
/// Returns `None` unless limit, remaining and reset are all present and
/// numeric. A missing `x-ratelimit-resource` defaults to `core`.
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let limit = header("x-ratelimit-limit")?.trim().parse().ok()?;
    let remaining = header("x-ratelimit-remaining")?.trim().parse().ok()?;
    let reset = header("x-ratelimit-reset")?.trim().parse().ok()?;
    let resource = header("x-ratelimit-resource")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| CORE_RESOURCE.to_string());

    Some(RateLimitInfo {
        resource,
        limit,
        remaining,
        reset,
        checked_at: Utc::now(),
    })
}
