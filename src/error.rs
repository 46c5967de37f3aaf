use crate::embeddings::CallError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "vectorization.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected values, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "vectorizer_builder", "tokenizer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the vectorizer runtime.
///
/// Batch vectorization never returns this type: per-object failures are reported
/// as [`ItemError`] values keyed by index. `Error` covers configuration, the
/// single-object path and query vectorization.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("Vectorization call failed: {0}")]
    Call(#[from] CallError),

    #[error("Vectorization failed: {0}")]
    Item(#[from] ItemError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Failure of a single object inside a batch.
///
/// Cloned freely: a call-level failure is copied to every object of the
/// sub-batch it hit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// The provider rejected this input while accepting its siblings.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// The whole provider call failed.
    #[error("{0}")]
    Call(CallError),

    #[error("text too long for vectorization ({tokens} tokens, limit {limit})")]
    TooLong { tokens: usize, limit: u64 },

    #[error("text too long for vectorization. Cannot wait for token refresh due to time limit")]
    TooLongForDeadline { tokens: usize },

    /// The remaining token budget cannot fit this input and the provider gave
    /// no reset interval to wait for.
    #[error("token budget exhausted and the provider reported no reset interval")]
    TokenBudgetExhausted,

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("request rate limit exceeded and will not refresh in time")]
    RateLimitExceeded,

    /// Token encoding could not be resolved; applied to the whole job.
    #[error("tokenizer error: {message}")]
    Tokenizer { message: String },

    /// The batch's vectorization settings are invalid; applied to the whole job.
    #[error("invalid vectorization config: {message}")]
    Configuration { message: String },

    #[error("vectorizer batch worker is not running")]
    WorkerUnavailable,
}

impl ItemError {
    pub fn provider(message: impl Into<String>) -> Self {
        ItemError::Provider {
            message: message.into(),
        }
    }

    /// Whether resubmitting the object later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ItemError::Call(e) => e.retryable,
            ItemError::TooLongForDeadline { .. }
            | ItemError::TokenBudgetExhausted
            | ItemError::DeadlineExceeded
            | ItemError::RateLimitExceeded
            | ItemError::WorkerUnavailable => true,
            ItemError::Provider { .. }
            | ItemError::TooLong { .. }
            | ItemError::Cancelled
            | ItemError::Tokenizer { .. }
            | ItemError::Configuration { .. } => false,
        }
    }
}

impl From<CallError> for ItemError {
    fn from(e: CallError) -> Self {
        ItemError::Call(e)
    }
}
