//! Integration tests with an in-process mock provider
#![allow(dead_code)]

pub mod mock_client;

use ai_lib_vectorizer::config::SchedulerConfig;
use ai_lib_vectorizer::Vectorizer;
use mock_client::{BodyExtractor, MockClient, TableTokenizer};
use std::sync::Arc;

/// Vectorizer over `client` that vectorizes each object's `body` property.
pub fn vectorizer(
    client: &Arc<MockClient>,
    tokenizer: TableTokenizer,
    config: SchedulerConfig,
) -> Vectorizer {
    mock_client::init_tracing();
    Vectorizer::builder()
        .client(client.clone())
        .tokenizer(Arc::new(tokenizer))
        .text_extractor(Arc::new(BodyExtractor))
        .scheduler_config(config)
        .build()
        .expect("vectorizer builds inside a runtime")
}
