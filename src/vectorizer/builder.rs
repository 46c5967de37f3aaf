use super::core::Vectorizer;
use super::signals::SchedulerSnapshot;
use crate::batch::Scheduler;
use crate::config::SchedulerConfig;
use crate::embeddings::Client;
use crate::objects::{ObjectTextExtractor, TextExtractor};
use crate::tokens::{TiktokenTokenizer, Tokenizer};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Builder for [`Vectorizer`].
///
/// Only the client is required. Scheduler settings default to
/// [`SchedulerConfig::from_env`].
#[derive(Default)]
pub struct VectorizerBuilder {
    client: Option<Arc<dyn Client>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    extractor: Option<Arc<dyn TextExtractor>>,
    config: Option<SchedulerConfig>,
}

impl VectorizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the vectorizer and spawn its batch worker on the current Tokio
    /// runtime.
    pub fn build(self) -> Result<Vectorizer> {
        let client = self.client.ok_or_else(|| {
            Error::configuration_with_context(
                "a vectorization client is required",
                ErrorContext::new().with_field_path("client"),
            )
        })?;
        let config = self.config.unwrap_or_else(SchedulerConfig::from_env);
        config.validate()?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                "the batch worker needs a Tokio runtime",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("vectorizer_builder"),
            )
        })?;

        let (jobs, rx) = mpsc::channel(config.queue_capacity);
        let (signals_tx, scheduler_signals) = watch::channel(SchedulerSnapshot::default());
        let scheduler = Scheduler::new(client.clone(), config.clone(), signals_tx);
        let worker = runtime.spawn(scheduler.run(rx));
        info!(
            queue_capacity = config.queue_capacity,
            max_batch_time_ms = config.max_batch_time.as_millis() as u64,
            "batch worker started"
        );

        Ok(Vectorizer {
            client,
            tokenizer: self
                .tokenizer
                .unwrap_or_else(|| Arc::new(TiktokenTokenizer::new())),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(ObjectTextExtractor::new())),
            config,
            jobs,
            worker,
            scheduler_signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_client() {
        let err = VectorizerBuilder::new()
            .build()
            .err()
            .expect("missing client must fail");
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("client")
        );
    }
}
