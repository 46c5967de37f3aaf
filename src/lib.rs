//! # ai-lib-vectorizer
//!
//! 这是面向嵌入模型提供方的自适应批量向量化运行时，在提供方速率限制内最大化吞吐。
//!
//! Adaptive batching vectorizer: turns domain objects into embedding vectors
//! through a remote provider while staying inside the provider's published
//! rate limits.
//!
//! ## Overview
//!
//! Callers hand in whole batches of objects. A single background worker splits
//! each batch into sub-batches sized by what the provider reported on its last
//! response (remaining tokens and requests, reset windows) and by how long
//! recent calls took per token. Every object ends up with either a vector or
//! its own error; a batch never fails as a whole.
//!
//! ## Key Features
//!
//! - **Budget learning**: the first call of a fresh [`Vectorizer`] sends the
//!   provider a single object to learn its rate limits
//! - **Adaptive sub-batches**: token budget, projected call time and object cap
//!   bound every provider call
//! - **Throttling**: waits out exhausted request budgets and oversized objects
//!   when the batch deadline allows it
//! - **Cancellation**: every request carries a [`RequestContext`]
//! - **Signals**: read-only view of the learned state via
//!   [`Vectorizer::signals`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_vectorizer::config::VectorizationConfig;
//! use ai_lib_vectorizer::embeddings::{CallError, Client, VectorizationResult, VectorizeResponse};
//! use ai_lib_vectorizer::objects::{ClassSettings, Object};
//! use ai_lib_vectorizer::{RequestContext, Vectorizer};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl Client for MyProvider {
//!     async fn vectorize(
//!         &self,
//!         _ctx: &RequestContext,
//!         input: &[String],
//!         _config: &VectorizationConfig,
//!     ) -> Result<VectorizeResponse, CallError> {
//!         let vectors = input.iter().map(|_| vec![0.0; 3]).collect();
//!         Ok(VectorizeResponse::new(VectorizationResult::from_vectors(input.to_vec(), vectors)))
//!     }
//!
//!     async fn vectorize_query(
//!         &self,
//!         _ctx: &RequestContext,
//!         input: &[String],
//!         _config: &VectorizationConfig,
//!     ) -> Result<VectorizationResult, CallError> {
//!         let vectors = input.iter().map(|_| vec![0.0; 3]).collect();
//!         Ok(VectorizationResult::from_vectors(input.to_vec(), vectors))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_vectorizer::Result<()> {
//!     let vectorizer = Vectorizer::builder()
//!         .client(Arc::new(MyProvider))
//!         .build()?;
//!
//!     let settings = ClassSettings::new(VectorizationConfig::default());
//!     let objects = vec![
//!         Object::new("Article").with_property("title", "hello"),
//!         Object::new("Article").with_property("title", "world"),
//!     ];
//!     let output = vectorizer
//!         .vectorize_batch(&RequestContext::new(), &objects, &[false, false], &settings)
//!         .await;
//!     assert!(output.all_succeeded());
//!
//!     vectorizer.shutdown().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`vectorizer`] | Facade, builder and runtime signals |
//! | [`batch`] | Adaptive batch scheduling and batch results |
//! | [`embeddings`] | Provider client seam and vectorization results |
//! | [`resilience`] | Provider rate-limit state and header parsing |
//! | [`tokens`] | Token counting per model encoding |
//! | [`objects`] | Object to text extraction and per-class settings |
//! | [`config`] | Vectorization and scheduler configuration |
//! | [`context`] | Request cancellation and deadlines |

pub mod batch;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod objects;
pub mod resilience;
pub mod tokens;
pub mod vectorizer;

// Re-export main types for convenience
pub use batch::BatchOutput;
pub use context::RequestContext;
pub use resilience::RateLimits;
pub use vectorizer::{SignalsSnapshot, Vectorizer, VectorizerBuilder};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ItemError};
