//! In-process mock provider for integration tests

use ai_lib_vectorizer::config::VectorizationConfig;
use ai_lib_vectorizer::embeddings::{CallError, Client, VectorizationResult, VectorizeResponse};
use ai_lib_vectorizer::objects::{ClassSettings, Object, TextExtractor};
use ai_lib_vectorizer::tokens::{TokenCounter, Tokenizer};
use ai_lib_vectorizer::{RateLimits, RequestContext};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(usize, &[String]) -> Result<VectorizeResponse, CallError> + Send + Sync;

/// Mock client that records every call and answers through a closure that
/// receives the call number and the input texts.
pub struct MockClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<Vec<String>>>,
    latency: Duration,
}

impl MockClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &[String]) -> Result<VectorizeResponse, CallError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Every call succeeds and reports `limits`.
    pub fn with_limits(limits: RateLimits) -> Self {
        Self::new(move |_, input| Ok(ok_response(input).with_rate_limits(limits)))
    }

    /// Every call succeeds without reporting any rate limits.
    pub fn ok() -> Self {
        Self::new(|_, input| Ok(ok_response(input)))
    }

    /// Simulated time each call takes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls().iter().map(Vec::len).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn respond(&self, input: &[String]) -> Result<VectorizeResponse, CallError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.to_vec());
            calls.len() - 1
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(call, input)
    }
}

#[async_trait]
impl Client for MockClient {
    async fn vectorize(
        &self,
        _ctx: &RequestContext,
        input: &[String],
        _config: &VectorizationConfig,
    ) -> Result<VectorizeResponse, CallError> {
        self.respond(input).await
    }

    async fn vectorize_query(
        &self,
        _ctx: &RequestContext,
        input: &[String],
        _config: &VectorizationConfig,
    ) -> Result<VectorizationResult, CallError> {
        self.respond(input).await.map(|r| r.result)
    }
}

/// Vector for a `doc-N` text: `[N, 1.0]`.
pub fn vector_for(text: &str) -> Vec<f32> {
    let id = text
        .rsplit('-')
        .next()
        .and_then(|n| n.parse::<f32>().ok())
        .unwrap_or(-1.0);
    vec![id, 1.0]
}

pub fn ok_response(input: &[String]) -> VectorizeResponse {
    let vectors = input.iter().map(|t| vector_for(t)).collect();
    VectorizeResponse::new(VectorizationResult::from_vectors(input.to_vec(), vectors))
}

/// Token budget with no request pressure.
pub fn token_limits(limit: u64, remaining: u64, reset: Duration) -> RateLimits {
    RateLimits::unbounded().with_tokens(limit, remaining, reset)
}

/// Uses the `body` property verbatim as the object's text.
pub struct BodyExtractor;

impl TextExtractor for BodyExtractor {
    fn text(&self, object: &Object, _settings: &ClassSettings) -> String {
        object
            .properties
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Token counts looked up per text; unknown texts count as one token.
#[derive(Clone, Default)]
pub struct TableTokenizer {
    counts: Arc<HashMap<String, usize>>,
}

struct TableCounter(Arc<HashMap<String, usize>>);

impl TokenCounter for TableCounter {
    fn count(&self, text: &str) -> usize {
        self.0.get(text).copied().unwrap_or(1)
    }
}

impl Tokenizer for TableTokenizer {
    fn encoding_for_model(
        &self,
        _model: &str,
    ) -> ai_lib_vectorizer::Result<Arc<dyn TokenCounter>> {
        Ok(Arc::new(TableCounter(self.counts.clone())))
    }
}

/// Objects `doc-{first}`, `doc-{first+1}`, ... with the given token counts.
pub fn docs_from(first: usize, tokens: &[usize]) -> (Vec<Object>, TableTokenizer) {
    let mut counts = HashMap::new();
    let objects = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let body = format!("doc-{}", first + i);
            counts.insert(body.clone(), *t);
            Object::new("Doc").with_property("body", body)
        })
        .collect();
    (
        objects,
        TableTokenizer {
            counts: Arc::new(counts),
        },
    )
}

pub fn docs(tokens: &[usize]) -> (Vec<Object>, TableTokenizer) {
    docs_from(0, tokens)
}

pub fn texts(ids: impl IntoIterator<Item = usize>) -> Vec<String> {
    ids.into_iter().map(|i| format!("doc-{}", i)).collect()
}

pub fn settings() -> ClassSettings {
    ClassSettings::new(VectorizationConfig::default())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
