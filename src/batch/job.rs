//! Batch jobs and their results.

use super::sub_batch::SubBatch;
use crate::config::VectorizationConfig;
use crate::context::RequestContext;
use crate::embeddings::{Vector, VectorizationResult};
use crate::error::ItemError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Index-aligned result of a batch: each non-skipped index has either a vector
/// or an entry in `errors`; skipped indices have neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutput {
    pub vectors: Vec<Option<Vector>>,
    pub errors: HashMap<usize, ItemError>,
}

impl BatchOutput {
    /// Output for `len` objects that were all skipped.
    pub fn empty(len: usize) -> Self {
        Self {
            vectors: vec![None; len],
            errors: HashMap::new(),
        }
    }

    /// Output where every non-skipped object failed with `error`.
    pub fn failed(skip: &[bool], error: ItemError) -> Self {
        let errors = skip
            .iter()
            .enumerate()
            .filter(|(_, s)| !**s)
            .map(|(i, _)| (i, error.clone()))
            .collect();
        Self {
            vectors: vec![None; skip.len()],
            errors,
        }
    }

    pub fn vector(&self, index: usize) -> Option<&Vector> {
        self.vectors.get(index).and_then(Option::as_ref)
    }

    pub fn error(&self, index: usize) -> Option<&ItemError> {
        self.errors.get(&index)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_some()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One caller's batch while it travels through the queue and the scheduler.
pub(crate) struct BatchJob {
    pub(crate) id: Uuid,
    pub(crate) texts: Vec<String>,
    pub(crate) tokens: Vec<usize>,
    pub(crate) skip: Vec<bool>,
    pub(crate) ctx: RequestContext,
    pub(crate) config: VectorizationConfig,
    pub(crate) start_time: Instant,
    deadline: Option<Instant>,
    vectors: Vec<Option<Vector>>,
    errors: HashMap<usize, ItemError>,
    done: oneshot::Sender<BatchOutput>,
}

impl BatchJob {
    /// Build a job whose time budget starts now. The receiver resolves exactly
    /// once, when the scheduler is finished with the job.
    pub(crate) fn new(
        texts: Vec<String>,
        tokens: Vec<usize>,
        skip: Vec<bool>,
        ctx: RequestContext,
        config: VectorizationConfig,
        max_batch_time: Duration,
    ) -> (Self, oneshot::Receiver<BatchOutput>) {
        debug_assert_eq!(texts.len(), skip.len());
        debug_assert_eq!(tokens.len(), skip.len());
        let (done, rx) = oneshot::channel();
        let start_time = Instant::now();
        // A budget too large for the clock means no budget at all.
        let budget_end = start_time.checked_add(max_batch_time);
        let deadline = match (ctx.deadline(), budget_end) {
            (Some(d), Some(b)) => Some(d.min(b)),
            (d, b) => d.or(b),
        };
        let len = texts.len();
        let job = Self {
            id: Uuid::new_v4(),
            texts,
            tokens,
            skip,
            ctx,
            config,
            start_time,
            deadline,
            vectors: vec![None; len],
            errors: HashMap::new(),
            done,
        };
        (job, rx)
    }

    pub(crate) fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether waiting `wait` from now would run past the job's deadline.
    /// Ending exactly on the deadline still counts as in time.
    pub(crate) fn would_exceed_deadline(&self, wait: Duration) -> bool {
        match (Instant::now().checked_add(wait), self.deadline) {
            (None, _) => true,
            (Some(end), Some(deadline)) => end > deadline,
            (Some(_), None) => false,
        }
    }

    /// Whether waiting `wait` from now ends strictly before the deadline.
    pub(crate) fn wait_ends_before_deadline(&self, wait: Duration) -> bool {
        match (Instant::now().checked_add(wait), self.deadline) {
            (None, _) => false,
            (Some(end), Some(deadline)) => end < deadline,
            (Some(_), None) => true,
        }
    }

    fn is_resolved(&self, index: usize) -> bool {
        self.skip[index] || self.vectors[index].is_some() || self.errors.contains_key(&index)
    }

    pub(crate) fn fail(&mut self, index: usize, error: ItemError) {
        self.errors.insert(index, error);
    }

    /// Fail every index from `from` on that has no outcome yet.
    pub(crate) fn fail_unresolved(&mut self, from: usize, error: ItemError) -> usize {
        let mut failed = 0;
        for index in from..self.len() {
            if !self.is_resolved(index) {
                self.errors.insert(index, error.clone());
                failed += 1;
            }
        }
        failed
    }

    /// Give every object of `batch` the same call-level error.
    pub(crate) fn fail_batch(&mut self, batch: &SubBatch, error: ItemError) {
        for &index in batch.indices() {
            self.errors.insert(index, error.clone());
        }
    }

    /// Merge a provider result for `batch` into the job, position by position.
    pub(crate) fn apply_result(&mut self, batch: &SubBatch, result: VectorizationResult) {
        let VectorizationResult {
            vectors,
            mut errors,
            ..
        } = result;
        let mut vectors = vectors.into_iter();
        for (pos, &index) in batch.indices().iter().enumerate() {
            let vector = vectors.next();
            if let Some(err) = errors.get_mut(pos).and_then(Option::take) {
                self.errors.insert(index, err);
                continue;
            }
            match vector {
                Some(v) if !v.is_empty() => self.vectors[index] = Some(v),
                _ => {
                    self.errors.insert(
                        index,
                        ItemError::provider("provider returned no embedding for this input"),
                    );
                }
            }
        }
    }

    /// Hand the results to the caller. Consumes the job.
    pub(crate) fn complete(self) {
        debug_assert!(
            (0..self.len()).all(|i| self.is_resolved(i)),
            "every non-skipped object must have a vector or an error"
        );
        let output = BatchOutput {
            vectors: self.vectors,
            errors: self.errors,
        };
        if self.done.send(output).is_err() {
            debug!(job_id = %self.id, "caller went away before the batch completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(skip: Vec<bool>) -> (BatchJob, oneshot::Receiver<BatchOutput>) {
        let n = skip.len();
        BatchJob::new(
            (0..n).map(|i| format!("text {}", i)).collect(),
            vec![1; n],
            skip,
            RequestContext::new(),
            VectorizationConfig::default(),
            Duration::from_secs(40),
        )
    }

    #[test]
    fn test_batch_output_helpers() {
        let out = BatchOutput::failed(&[false, true, false], ItemError::RateLimitExceeded);
        assert_eq!(out.len(), 3);
        assert_eq!(out.failure_count(), 2);
        assert!(out.error(1).is_none());
        assert_eq!(out.success_count(), 0);
        assert!(BatchOutput::empty(4).all_succeeded());
    }

    #[tokio::test]
    async fn test_apply_result_partial_failure() {
        let (mut job, rx) = job(vec![false, false, false]);
        let mut batch = SubBatch::with_capacity(3);
        for i in 0..3 {
            batch.push(i, job.texts[i].clone(), 1);
        }
        let result = VectorizationResult::from_vectors(
            batch.texts().to_vec(),
            vec![vec![1.0], vec![], vec![3.0]],
        )
        .with_error(1, ItemError::provider("bad input"));
        job.apply_result(&batch, result);
        job.complete();

        let out = rx.await.unwrap();
        assert_eq!(out.vector(0), Some(&vec![1.0]));
        assert_eq!(out.error(1), Some(&ItemError::provider("bad input")));
        assert_eq!(out.vector(2), Some(&vec![3.0]));
    }

    #[tokio::test]
    async fn test_apply_result_missing_vectors_become_errors() {
        let (mut job, rx) = job(vec![false, false]);
        let mut batch = SubBatch::with_capacity(2);
        batch.push(0, job.texts[0].clone(), 1);
        batch.push(1, job.texts[1].clone(), 1);
        job.apply_result(
            &batch,
            VectorizationResult::from_vectors(vec![], vec![vec![0.5]]),
        );
        job.complete();

        let out = rx.await.unwrap();
        assert!(out.vector(0).is_some());
        assert!(matches!(out.error(1), Some(ItemError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_fail_unresolved_leaves_skipped_and_resolved_alone() {
        let (mut job, rx) = job(vec![false, true, false, false]);
        job.fail(0, ItemError::TooLong { tokens: 9, limit: 1 });
        let failed = job.fail_unresolved(0, ItemError::Cancelled);
        assert_eq!(failed, 2);
        job.complete();

        let out = rx.await.unwrap();
        assert_eq!(out.error(0), Some(&ItemError::TooLong { tokens: 9, limit: 1 }));
        assert!(out.error(1).is_none());
        assert_eq!(out.error(2), Some(&ItemError::Cancelled));
        assert_eq!(out.error(3), Some(&ItemError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_uses_earliest_of_budget_and_context() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(5));
        let (job, _rx) = BatchJob::new(
            vec![],
            vec![],
            vec![],
            ctx,
            VectorizationConfig::default(),
            Duration::from_secs(40),
        );
        assert!(!job.would_exceed_deadline(Duration::from_secs(5)));
        assert!(job.would_exceed_deadline(Duration::from_secs(6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ending_on_deadline_is_not_before_it() {
        let (job, _rx) = job(vec![false]);
        assert!(job.wait_ends_before_deadline(Duration::from_millis(39_999)));
        assert!(!job.wait_ends_before_deadline(Duration::from_secs(40)));
        assert!(!job.would_exceed_deadline(Duration::from_secs(40)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_budget_and_wait_do_not_overflow() {
        let (unbounded, _rx) = BatchJob::new(
            vec!["text".to_string()],
            vec![1],
            vec![false],
            RequestContext::new(),
            VectorizationConfig::default(),
            Duration::MAX,
        );
        assert!(unbounded.wait_ends_before_deadline(Duration::from_secs(3600)));
        assert!(!unbounded.would_exceed_deadline(Duration::from_secs(3600)));
        assert!(unbounded.would_exceed_deadline(Duration::MAX));
        assert!(!unbounded.wait_ends_before_deadline(Duration::MAX));

        let (bounded, _rx) = job(vec![false]);
        assert!(bounded.would_exceed_deadline(Duration::MAX));
    }
}
