//! Token 计数模块：为批处理调度器提供每段文本的 Token 数。
//!
//! # Token Counting Module
//!
//! The batch scheduler sizes sub-batches by token count, so every object is
//! counted once, up front, before its batch is queued.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Tokenizer`] | Resolves the encoding for a model (may fail once per batch) |
//! | [`TokenCounter`] | Counts tokens for a text under a resolved encoding |
//! | [`TiktokenTokenizer`] | Default tokenizer: BPE encodings from `tiktoken-rs`, per-model overrides |
//! | [`BpeCounter`] | Exact count under one BPE encoding |
//! | [`CharacterEstimator`] | Opt-in approximation for unknown models (4 chars ≈ 1 token) |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_vectorizer::tokens::{TiktokenTokenizer, Tokenizer};
//!
//! let tokenizer = TiktokenTokenizer::new();
//! let tokens = tokenizer.count_tokens("text-embedding-3-small", "hello world").unwrap();
//! assert_eq!(tokens, 2);
//! assert!(tokenizer.encoding_for_model("my-custom-model").is_err());
//! ```

mod counter;

pub use counter::{
    encoding_model, BpeCounter, CharacterEstimator, TiktokenTokenizer, TokenCounter, Tokenizer,
};
