//! 向量化入口模块：单对象直连调用与批量排队调度的统一门面。
//!
//! # Vectorizer
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Vectorizer`] | Single-object, batch and query vectorization |
//! | [`VectorizerBuilder`] | Wires client, tokenizer, extractor and scheduler config |
//! | [`SignalsSnapshot`] | Learned rate limits, time per token and queue depth |
//!
//! Building a [`Vectorizer`] spawns its batch worker, so it must happen inside
//! a Tokio runtime.

mod builder;
mod core;
mod signals;

pub use self::core::Vectorizer;
pub use builder::VectorizerBuilder;
pub use signals::{QueueSnapshot, SchedulerSnapshot, SignalsSnapshot};
