//! 限流状态模块：记录服务商返回的 Token 与请求配额。
//!
//! # Rate Limit State
//!
//! Providers report their remaining budget with every response. The batch
//! scheduler keeps the most recent [`RateLimits`] and sizes the next sub-batch
//! against it.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `limit_tokens` / `limit_requests` | Bucket size per reset window, `None` when unreported |
//! | `remaining_tokens` / `remaining_requests` | What is left in the current window |
//! | `reset_tokens` / `reset_requests` | Time until the bucket refills |
//!
//! ```rust
//! use ai_lib_vectorizer::resilience::RateLimits;
//! use reqwest::header::{HeaderMap, HeaderValue};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("x-ratelimit-remaining-requests", HeaderValue::from_static("0"));
//! headers.insert("x-ratelimit-reset-requests", HeaderValue::from_static("20s"));
//!
//! let limits = RateLimits::from_headers(&headers).unwrap();
//! assert!(limits.requests_exhausted());
//! ```

mod rate_limits;

pub use rate_limits::{
    parse_reset, RateLimits, HEADER_LIMIT_REQUESTS, HEADER_LIMIT_TOKENS,
    HEADER_REMAINING_REQUESTS, HEADER_REMAINING_TOKENS, HEADER_RESET_REQUESTS,
    HEADER_RESET_TOKENS,
};
