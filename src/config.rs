//! Vectorizer configuration.
//!
//! [`VectorizationConfig`] is forwarded untouched to the [`Client`](crate::embeddings::Client);
//! [`SchedulerConfig`] tunes the batch scheduler and can be overridden through
//! `VECTORIZER_*` environment variables.

use crate::resilience::RateLimits;
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_TYPE: &str = "text";
pub const DEFAULT_MODEL: &str = "ada";
pub const DEFAULT_MODEL_VERSION: &str = "002";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Provider limit on inputs per embeddings request.
pub const MAX_OBJECTS_PER_BATCH: usize = 2000;
pub const BATCH_CHANNEL_SIZE: usize = 100;
/// Soft ceiling for a single request. Time per token flattens out with batch
/// size but varies a lot, so stay well below the provider's 50s timeout.
pub const MAX_TIME_PER_BATCH: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BATCH_TIME: Duration = Duration::from_secs(40);
pub const TOKEN_BUDGET_RATIO: f64 = 0.95;

static MODEL_DIMENSIONS: Lazy<HashMap<&'static str, &'static [usize]>> = Lazy::new(|| {
    HashMap::from([
        ("text-embedding-3-small", &[512_usize, 1536][..]),
        ("text-embedding-3-large", &[256_usize, 1024, 3072][..]),
    ])
});

/// Provider settings passed through to the client on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorizationConfig {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub model: String,
    pub model_version: String,
    pub resource_name: String,
    pub deployment_id: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub is_azure: bool,
    pub dimensions: Option<usize>,
}

impl Default for VectorizationConfig {
    fn default() -> Self {
        Self {
            doc_type: DEFAULT_TYPE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            resource_name: String::new(),
            deployment_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            is_azure: false,
            dimensions: None,
        }
    }
}

impl VectorizationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_azure(mut self, resource_name: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        self.is_azure = true;
        self.resource_name = resource_name.into();
        self.deployment_id = deployment_id.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                "base URL is not a valid URL",
                ErrorContext::new()
                    .with_field_path("vectorization.baseURL")
                    .with_details(e.to_string())
                    .with_source("vectorization_config"),
            )
        })?;

        if self.is_azure && (self.resource_name.is_empty() || self.deployment_id.is_empty()) {
            return Err(Error::configuration_with_context(
                "both resourceName and deploymentId must be provided for Azure",
                ErrorContext::new()
                    .with_field_path("vectorization.resourceName")
                    .with_source("vectorization_config"),
            ));
        }

        if let Some(dims) = self.dimensions {
            match MODEL_DIMENSIONS.get(self.model.as_str()) {
                Some(allowed) if allowed.contains(&dims) => {}
                Some(allowed) => {
                    return Err(Error::configuration_with_context(
                        format!("dimensions {} not supported by model {}", dims, self.model),
                        ErrorContext::new()
                            .with_field_path("vectorization.dimensions")
                            .with_details(format!("supported: {:?}", allowed))
                            .with_source("vectorization_config"),
                    ))
                }
                None => {
                    return Err(Error::configuration_with_context(
                        format!("model {} does not support setting dimensions", self.model),
                        ErrorContext::new()
                            .with_field_path("vectorization.dimensions")
                            .with_source("vectorization_config"),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Tuning for the batch scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Overall time budget of one batch, measured from when it is queued.
    pub max_batch_time: Duration,
    pub queue_capacity: usize,
    pub max_objects_per_batch: usize,
    /// Soft per-request ceiling for the projected processing time of a sub-batch.
    pub max_time_per_batch: Duration,
    /// Share of the remaining token budget a sub-batch may use.
    pub token_budget_ratio: f64,
    /// Budget assumed when the provider reports no rate limits at all.
    pub fallback_rate_limits: RateLimits,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_time: DEFAULT_MAX_BATCH_TIME,
            queue_capacity: BATCH_CHANNEL_SIZE,
            max_objects_per_batch: MAX_OBJECTS_PER_BATCH,
            max_time_per_batch: MAX_TIME_PER_BATCH,
            token_budget_ratio: TOKEN_BUDGET_RATIO,
            fallback_rate_limits: RateLimits::unbounded(),
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by environment variables:
    /// - `VECTORIZER_MAX_BATCH_TIME_SECS`
    /// - `VECTORIZER_QUEUE_CAPACITY`
    /// - `VECTORIZER_MAX_OBJECTS_PER_BATCH`
    /// - `VECTORIZER_MAX_TIME_PER_BATCH_SECS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = env_parse::<u64>("VECTORIZER_MAX_BATCH_TIME_SECS") {
            cfg.max_batch_time = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("VECTORIZER_QUEUE_CAPACITY") {
            cfg.queue_capacity = n;
        }
        if let Some(n) = env_parse::<usize>("VECTORIZER_MAX_OBJECTS_PER_BATCH") {
            cfg.max_objects_per_batch = n;
        }
        if let Some(secs) = env_parse::<u64>("VECTORIZER_MAX_TIME_PER_BATCH_SECS") {
            cfg.max_time_per_batch = Duration::from_secs(secs);
        }
        cfg
    }

    pub fn with_max_batch_time(mut self, d: Duration) -> Self {
        self.max_batch_time = d;
        self
    }
    pub fn with_queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }
    pub fn with_max_objects_per_batch(mut self, n: usize) -> Self {
        self.max_objects_per_batch = n;
        self
    }
    pub fn with_max_time_per_batch(mut self, d: Duration) -> Self {
        self.max_time_per_batch = d;
        self
    }
    pub fn with_token_budget_ratio(mut self, r: f64) -> Self {
        self.token_budget_ratio = r;
        self
    }
    pub fn with_fallback_rate_limits(mut self, rl: RateLimits) -> Self {
        self.fallback_rate_limits = rl;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: &str| {
            Err(Error::configuration_with_context(
                msg.to_string(),
                ErrorContext::new()
                    .with_field_path(format!("scheduler.{}", field))
                    .with_source("scheduler_config"),
            ))
        };
        if self.queue_capacity == 0 {
            return invalid("queue_capacity", "queue capacity must be at least 1");
        }
        if self.max_objects_per_batch == 0 {
            return invalid("max_objects_per_batch", "max objects per batch must be at least 1");
        }
        if !(self.token_budget_ratio > 0.0 && self.token_budget_ratio <= 1.0) {
            return invalid("token_budget_ratio", "token budget ratio must be in (0, 1]");
        }
        if self.max_batch_time.is_zero() {
            return invalid("max_batch_time", "max batch time must be positive");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
