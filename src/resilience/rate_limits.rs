//! Provider-reported rate limit budget.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const HEADER_LIMIT_REQUESTS: &str = "x-ratelimit-limit-requests";
pub const HEADER_LIMIT_TOKENS: &str = "x-ratelimit-limit-tokens";
pub const HEADER_REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
pub const HEADER_REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
pub const HEADER_RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
pub const HEADER_RESET_TOKENS: &str = "x-ratelimit-reset-tokens";

/// Token and request budget last observed from the provider.
///
/// Reset fields are the time until the respective bucket refills, not an
/// absolute instant. Bucket sizes the provider did not report are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub limit_tokens: Option<u64>,
    pub remaining_tokens: u64,
    #[serde(with = "duration_secs")]
    pub reset_tokens: Duration,
    pub limit_requests: Option<u64>,
    pub remaining_requests: u64,
    #[serde(with = "duration_secs")]
    pub reset_requests: Duration,
}

impl RateLimits {
    /// Budget with no practical bound, used when a provider never reports one.
    pub fn unbounded() -> Self {
        Self {
            limit_tokens: None,
            remaining_tokens: u64::MAX,
            reset_tokens: Duration::ZERO,
            limit_requests: None,
            remaining_requests: u64::MAX,
            reset_requests: Duration::ZERO,
        }
    }

    pub fn with_tokens(mut self, limit: u64, remaining: u64, reset: Duration) -> Self {
        self.limit_tokens = Some(limit);
        self.remaining_tokens = remaining;
        self.reset_tokens = reset;
        self
    }

    pub fn with_requests(mut self, limit: u64, remaining: u64, reset: Duration) -> Self {
        self.limit_requests = Some(limit);
        self.remaining_requests = remaining;
        self.reset_requests = reset;
        self
    }

    /// True when the request bucket is empty and the provider said when it refills.
    pub fn requests_exhausted(&self) -> bool {
        self.remaining_requests == 0 && self.reset_requests > Duration::ZERO
    }

    /// Add tokens expected to have refilled while waiting.
    pub fn credit_tokens(&mut self, tokens: u64) {
        self.remaining_tokens = self.remaining_tokens.saturating_add(tokens);
    }

    /// Parse `x-ratelimit-*` response headers.
    ///
    /// Returns `None` when none of the headers is present. Some providers
    /// (e.g. Azure, or free tiers that only report daily limits) send a
    /// subset: a missing limit stays unknown, a missing remaining count falls
    /// back to the limit, or to unbounded when the bucket is not reported at
    /// all. Missing resets are zero.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let names = [
            HEADER_LIMIT_REQUESTS,
            HEADER_LIMIT_TOKENS,
            HEADER_REMAINING_REQUESTS,
            HEADER_REMAINING_TOKENS,
            HEADER_RESET_REQUESTS,
            HEADER_RESET_TOKENS,
        ];
        if !names.iter().any(|n| headers.contains_key(*n)) {
            return None;
        }
        let limit_tokens = header_u64(headers, HEADER_LIMIT_TOKENS);
        let limit_requests = header_u64(headers, HEADER_LIMIT_REQUESTS);
        Some(Self {
            limit_tokens,
            remaining_tokens: header_u64(headers, HEADER_REMAINING_TOKENS)
                .or(limit_tokens)
                .unwrap_or(u64::MAX),
            reset_tokens: header_duration(headers, HEADER_RESET_TOKENS),
            limit_requests,
            remaining_requests: header_u64(headers, HEADER_REMAINING_REQUESTS)
                .or(limit_requests)
                .unwrap_or(u64::MAX),
            reset_requests: header_duration(headers, HEADER_RESET_REQUESTS),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|s| s.parse::<u64>().ok())
}

fn header_duration(headers: &HeaderMap, name: &str) -> Duration {
    header_str(headers, name)
        .and_then(parse_reset)
        .unwrap_or(Duration::ZERO)
}

/// Parse a reset value: bare seconds (`"20"`, `"0.5"`) or a Go-style duration
/// (`"6m0s"`, `"1h2m"`, `"1.5s"`, `"20ms"`).
pub fn parse_reset(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<f64>() {
        return nanos_to_duration(secs * 1e9);
    }

    let mut total_nanos = 0.0_f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3_600e9,
            "m" => 60e9,
            "s" => 1e9,
            "ms" => 1e6,
            "us" | "µs" => 1e3,
            "ns" => 1.0,
            _ => return None,
        };
        total_nanos += value * scale;
        rest = &rest[unit_len..];
    }
    nanos_to_duration(total_nanos)
}

fn nanos_to_duration(nanos: f64) -> Option<Duration> {
    if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration must be a non-negative number"))
    }
}
