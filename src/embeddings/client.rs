//! Provider client seam.

use super::types::{VectorizationResult, VectorizeResponse};
use crate::config::VectorizationConfig;
use crate::context::RequestContext;
use crate::resilience::RateLimits;
use async_trait::async_trait;
use thiserror::Error;

/// Performs remote vectorization calls.
///
/// Implementations own the wire protocol, authentication and rate-limit header
/// parsing ([`RateLimits::from_headers`] covers the common `x-ratelimit-*`
/// headers). They should honour `ctx` cancellation; the scheduler never
/// interrupts a call in flight.
#[async_trait]
pub trait Client: Send + Sync {
    /// Vectorize `input` for indexing. Results are index-aligned with `input`.
    async fn vectorize(
        &self,
        ctx: &RequestContext,
        input: &[String],
        config: &VectorizationConfig,
    ) -> Result<VectorizeResponse, CallError>;

    /// Vectorize `input` at query time. No rate-limit feedback is needed.
    async fn vectorize_query(
        &self,
        ctx: &RequestContext,
        input: &[String],
        config: &VectorizationConfig,
    ) -> Result<VectorizationResult, CallError>;
}

/// A provider call that failed as a whole (transport failure, HTTP error, ...).
///
/// Providers often still send rate-limit headers with error responses; when
/// they do, `rate_limits` carries them so the scheduler can refresh its budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallError {
    pub message: String,
    pub status: Option<u16>,
    pub retryable: bool,
    pub rate_limits: Option<RateLimits>,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: false,
            rate_limits: None,
        }
    }

    /// Error for an HTTP status; 429 and 5xx are retryable.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: format!("HTTP {}: {}", status, message.into()),
            status: Some(status),
            retryable: status == 429 || status >= 500,
            rate_limits: None,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn with_rate_limits(mut self, rate_limits: RateLimits) -> Self {
        self.rate_limits = Some(rate_limits);
        self
    }
}
