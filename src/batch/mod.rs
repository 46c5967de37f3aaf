//! 自适应批处理模块：在提供方速率限制内把对象批次拆分为子批次并调度执行。
//!
//! # Adaptive Batching Module
//!
//! Callers submit whole batches of objects; a single background worker walks
//! each batch in order and groups consecutive objects into sub-batches, each
//! sent to the provider in one call.
//!
//! ## Admission
//!
//! An object joins the current sub-batch while all of the following hold:
//! - its tokens plus the sub-batch's stay below 95% of the remaining token budget
//! - the projected time of the sub-batch (observed time per token × tokens)
//!   stays under the per-call ceiling
//! - the sub-batch holds fewer than the per-call object cap
//!
//! Otherwise the sub-batch is sent first. An object larger than the whole
//! remaining budget waits for a proportional refill when the job deadline
//! allows it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchOutput`] | Index-aligned vectors and per-object errors of one batch |
//!
//! The worker's state (learned rate limits, time per token) outlives single
//! jobs and is published through
//! [`Vectorizer::signals`](crate::vectorizer::Vectorizer::signals).

mod job;
mod scheduler;
mod sub_batch;

pub use job::BatchOutput;

pub(crate) use job::BatchJob;
pub(crate) use scheduler::Scheduler;
