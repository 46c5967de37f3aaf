//! Token counter implementations.

use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Counts tokens of a text under one resolved encoding.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Resolves the token encoding used by a model.
///
/// Resolution happens once per batch; a failure fails every object of that
/// batch before any provider call is made.
pub trait Tokenizer: Send + Sync {
    fn encoding_for_model(&self, model: &str) -> Result<Arc<dyn TokenCounter>>;

    fn count_tokens(&self, model: &str, text: &str) -> Result<usize> {
        Ok(self.encoding_for_model(model)?.count(text))
    }
}

/// Fast character-based approximation. Only used when opted into with
/// [`TiktokenTokenizer::with_fallback`].
#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: f64,
}
impl CharacterEstimator {
    pub fn new() -> Self {
        Self::with_ratio(4.0)
    }
    pub fn with_ratio(r: f64) -> Self {
        Self { chars_per_token: r }
    }
}
impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}
impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        (text.len() as f64 / self.chars_per_token).ceil() as usize
    }
}

/// Exact BPE token count.
pub struct BpeCounter(CoreBPE);

impl BpeCounter {
    pub fn new(bpe: CoreBPE) -> Self {
        Self(bpe)
    }
}

impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        self.0.encode_with_special_tokens(text).len()
    }
}

// Embedding models tokenize like the chat model they were trained alongside.
static MODEL_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("text-embedding-ada-002", "gpt-4"),
        ("text-embedding-3-small", "gpt-4"),
        ("text-embedding-3-large", "gpt-4"),
        ("ada", "gpt-4"),
    ])
});

/// Resolve the model name whose encoding `model` shares.
pub fn encoding_model(model: &str) -> &str {
    MODEL_ALIASES.get(model).copied().unwrap_or(model)
}

/// Default tokenizer: resolves the BPE encoding of a model with `tiktoken-rs`
/// and caches it per model.
///
/// A model without a known encoding is an error unless a fallback counter was
/// opted into.
pub struct TiktokenTokenizer {
    counters: RwLock<HashMap<String, Arc<dyn TokenCounter>>>,
    fallback: Option<Arc<dyn TokenCounter>>,
}

impl TiktokenTokenizer {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            fallback: None,
        }
    }

    /// Count with `counter` for models `tiktoken-rs` does not know, e.g.
    /// [`CharacterEstimator`] for self-hosted OpenAI-compatible models.
    pub fn with_fallback(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.fallback = Some(counter);
        self
    }

    /// Register a counter for a model (or an encoding alias such as `gpt-4`).
    pub fn with_counter(self, model: impl Into<String>, counter: Arc<dyn TokenCounter>) -> Self {
        if let Ok(mut c) = self.counters.write() {
            c.insert(model.into().to_lowercase(), counter);
        }
        self
    }

    fn cached(&self, model: &str) -> Result<Option<Arc<dyn TokenCounter>>> {
        let c = self
            .counters
            .read()
            .map_err(|_| Error::runtime("tokenizer registry poisoned"))?;
        Ok(c.get(model)
            .or_else(|| c.get(encoding_model(model)))
            .cloned())
    }
}

impl Default for TiktokenTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encoding_for_model(&self, model: &str) -> Result<Arc<dyn TokenCounter>> {
        let ml = model.trim().to_lowercase();
        if ml.is_empty() {
            return Err(Error::configuration_with_context(
                "no token encoding for an empty model name",
                ErrorContext::new()
                    .with_field_path("vectorization.model")
                    .with_source("tokenizer"),
            ));
        }
        if let Some(counter) = self.cached(&ml)? {
            return Ok(counter);
        }

        match tiktoken_rs::get_bpe_from_model(encoding_model(&ml)) {
            Ok(bpe) => {
                debug!(model = %ml, "loaded token encoding");
                let counter: Arc<dyn TokenCounter> = Arc::new(BpeCounter::new(bpe));
                if let Ok(mut c) = self.counters.write() {
                    c.entry(ml).or_insert_with(|| counter.clone());
                }
                Ok(counter)
            }
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    warn!(model = %ml, error = %e, "no token encoding, estimating");
                    Ok(fallback.clone())
                }
                None => Err(Error::configuration_with_context(
                    format!("no token encoding for model '{}'", model),
                    ErrorContext::new()
                        .with_field_path("vectorization.model")
                        .with_details(e.to_string())
                        .with_source("tokenizer"),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);
    impl TokenCounter for Fixed {
        fn count(&self, _text: &str) -> usize {
            self.0
        }
    }

    #[test]
    fn test_character_estimator() {
        let counter = CharacterEstimator::new();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("abcd"), 1);
        assert_eq!(counter.count("abcde"), 2);
        assert_eq!(CharacterEstimator::with_ratio(2.0).count("abcd"), 2);
    }

    #[test]
    fn test_encoding_model_aliases() {
        assert_eq!(encoding_model("text-embedding-3-small"), "gpt-4");
        assert_eq!(encoding_model("text-embedding-ada-002"), "gpt-4");
        assert_eq!(encoding_model("my-custom-model"), "my-custom-model");
    }

    #[test]
    fn test_embedding_models_count_with_cl100k() {
        let tokenizer = TiktokenTokenizer::new();
        for model in ["text-embedding-3-small", "text-embedding-ada-002", "ada"] {
            assert_eq!(tokenizer.count_tokens(model, "hello world").unwrap(), 2);
            assert_eq!(tokenizer.count_tokens(model, "tiktoken is great!").unwrap(), 6);
        }
        assert_eq!(tokenizer.count_tokens("gpt-4", "").unwrap(), 0);
    }

    #[test]
    fn test_special_tokens_are_encoded_not_rejected() {
        let tokenizer = TiktokenTokenizer::new();
        assert_eq!(
            tokenizer
                .count_tokens("text-embedding-3-large", "<|endoftext|>")
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_encoding_is_cached_per_model() {
        let tokenizer = TiktokenTokenizer::new();
        let a = tokenizer.encoding_for_model("text-embedding-3-small").unwrap();
        let b = tokenizer.encoding_for_model("Text-Embedding-3-Small").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_model_fails_without_fallback() {
        let err = TiktokenTokenizer::new()
            .encoding_for_model("my-custom-model")
            .err()
            .unwrap();
        assert!(err.to_string().contains("no token encoding for model"));
    }

    #[test]
    fn test_fallback_is_opt_in() {
        let tokenizer =
            TiktokenTokenizer::new().with_fallback(Arc::new(CharacterEstimator::new()));
        assert_eq!(tokenizer.count_tokens("my-custom-model", "abcdefgh").unwrap(), 2);
        assert_eq!(tokenizer.count_tokens("gpt-4", "hello world").unwrap(), 2);
    }

    #[test]
    fn test_override_resolves_through_alias() {
        let tokenizer = TiktokenTokenizer::new().with_counter("gpt-4", Arc::new(Fixed(7)));
        assert_eq!(tokenizer.count_tokens("text-embedding-3-large", "x").unwrap(), 7);
        assert_eq!(tokenizer.count_tokens("GPT-4", "x").unwrap(), 7);
    }

    #[test]
    fn test_empty_model_name_fails() {
        assert!(TiktokenTokenizer::new().encoding_for_model("  ").is_err());
    }
}
