use super::signals::{QueueSnapshot, SchedulerSnapshot, SignalsSnapshot};
use crate::batch::{BatchJob, BatchOutput};
use crate::config::SchedulerConfig;
use crate::context::RequestContext;
use crate::embeddings::{combine_vectors, Client, Vector, VectorizationResult};
use crate::error::ItemError;
use crate::objects::{ClassSettings, Object, TextExtractor};
use crate::tokens::Tokenizer;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Vectorizes single objects directly and whole batches through the adaptive
/// batch worker.
///
/// Every clone of the job queue feeds one worker task, so all batches of this
/// instance share the rate-limit budget it has learned. Two instances talking
/// to the same provider account know nothing of each other.
pub struct Vectorizer {
    pub(crate) client: Arc<dyn Client>,
    pub(crate) tokenizer: Arc<dyn Tokenizer>,
    pub(crate) extractor: Arc<dyn TextExtractor>,
    pub(crate) config: SchedulerConfig,
    pub(crate) jobs: mpsc::Sender<BatchJob>,
    pub(crate) worker: JoinHandle<()>,
    pub(crate) scheduler_signals: watch::Receiver<SchedulerSnapshot>,
}

impl Vectorizer {
    pub fn builder() -> super::VectorizerBuilder {
        super::VectorizerBuilder::new()
    }

    /// Vectorize one object with a single provider call, bypassing the queue.
    ///
    /// When the provider splits the text into several chunks the chunk vectors
    /// are averaged.
    pub async fn vectorize_object(
        &self,
        ctx: &RequestContext,
        object: &Object,
        settings: &ClassSettings,
    ) -> Result<Vector> {
        settings.vectorization_config().validate()?;
        let text = self.extractor.text(object, settings);
        let response = self
            .client
            .vectorize(ctx, &[text], settings.vectorization_config())
            .await?;
        single_vector(response.result)
    }

    /// Vectorize `objects`, leaving out every index whose `skip` flag is set.
    ///
    /// Never fails as a whole: each non-skipped index of the output has either
    /// a vector or an error. Waits for queue space when the worker is behind.
    ///
    /// # Panics
    ///
    /// If `skip` and `objects` differ in length.
    pub async fn vectorize_batch(
        &self,
        ctx: &RequestContext,
        objects: &[Object],
        skip: &[bool],
        settings: &ClassSettings,
    ) -> BatchOutput {
        assert_eq!(
            objects.len(),
            skip.len(),
            "objects and skip flags must be index-aligned"
        );

        if skip.iter().all(|s| *s) {
            return BatchOutput::empty(objects.len());
        }

        let config = settings.vectorization_config().clone();
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejecting batch with invalid vectorization config");
            return BatchOutput::failed(
                skip,
                ItemError::Configuration {
                    message: e.to_string(),
                },
            );
        }
        let counter = match self.tokenizer.encoding_for_model(&config.model) {
            Ok(counter) => counter,
            Err(e) => {
                warn!(model = %config.model, error = %e, "token encoding unavailable");
                return BatchOutput::failed(
                    skip,
                    ItemError::Tokenizer {
                        message: e.to_string(),
                    },
                );
            }
        };

        let mut texts = Vec::with_capacity(objects.len());
        let mut tokens = Vec::with_capacity(objects.len());
        for (object, skipped) in objects.iter().zip(skip) {
            if *skipped {
                texts.push(String::new());
                tokens.push(0);
                continue;
            }
            let text = self.extractor.text(object, settings);
            tokens.push(counter.count(&text));
            texts.push(text);
        }

        let (job, done) = BatchJob::new(
            texts,
            tokens,
            skip.to_vec(),
            ctx.clone(),
            config,
            self.config.max_batch_time,
        );
        debug!(job_id = %job.id, objects = objects.len(), "queueing batch job");

        if self.jobs.send(job).await.is_err() {
            warn!("batch worker is gone, failing batch");
            return BatchOutput::failed(skip, ItemError::WorkerUnavailable);
        }
        match done.await {
            Ok(output) => output,
            Err(_) => BatchOutput::failed(skip, ItemError::WorkerUnavailable),
        }
    }

    /// Vectorize query texts into one vector, the mean of the per-text vectors.
    pub async fn vectorize_query(
        &self,
        ctx: &RequestContext,
        texts: &[String],
        settings: &ClassSettings,
    ) -> Result<Vector> {
        if texts.is_empty() {
            return Err(Error::validation_with_context(
                "no query texts to vectorize",
                ErrorContext::new().with_field_path("texts"),
            ));
        }
        settings.vectorization_config().validate()?;
        let result = self
            .client
            .vectorize_query(ctx, texts, settings.vectorization_config())
            .await?;
        if let Some(err) = result.errors.iter().flatten().next() {
            return Err(err.clone().into());
        }
        combine_vectors(&result.vectors)
    }

    /// Point-in-time view of the worker and its queue.
    pub fn signals(&self) -> SignalsSnapshot {
        let max = self.jobs.max_capacity();
        SignalsSnapshot {
            scheduler: self.scheduler_signals.borrow().clone(),
            queue: QueueSnapshot {
                capacity: max,
                queued: max.saturating_sub(self.jobs.capacity()),
            },
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Stop accepting batches and wait for the worker to finish the ones
    /// already queued.
    pub async fn shutdown(self) -> Result<()> {
        let Self { jobs, worker, .. } = self;
        drop(jobs);
        worker
            .await
            .map_err(|e| Error::runtime(format!("batch worker failed: {}", e)))
    }
}

fn single_vector(result: VectorizationResult) -> Result<Vector> {
    if let Some(err) = result.errors.into_iter().flatten().next() {
        return Err(err.into());
    }
    match result.vectors.len() {
        0 => Err(Error::Item(ItemError::provider(
            "provider returned no embedding for this input",
        ))),
        1 => Ok(result.vectors.into_iter().next().unwrap_or_default()),
        _ => combine_vectors(&result.vectors),
    }
}
