//! Embedding support.
//!
//! This module provides:
//! - The [`Client`] trait the batch scheduler dispatches through
//! - Call results and call-level errors
//! - Vector combination for multi-chunk results

mod client;
mod types;
mod vectors;

pub use client::{CallError, Client};
pub use types::{Vector, VectorizationResult, VectorizeResponse};
pub use vectors::combine_vectors;
