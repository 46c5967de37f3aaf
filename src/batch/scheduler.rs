//! The adaptive batch worker.

use super::job::BatchJob;
use super::sub_batch::SubBatch;
use crate::config::SchedulerConfig;
use crate::embeddings::Client;
use crate::error::ItemError;
use crate::resilience::RateLimits;
use crate::vectorizer::SchedulerSnapshot;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Single consumer of the job queue.
///
/// Jobs run strictly one after another, so the rate-limit state and the
/// time-per-token estimate have exactly one reader and one writer. Both
/// persist across jobs for the lifetime of the owning vectorizer.
pub(crate) struct Scheduler {
    client: Arc<dyn Client>,
    config: SchedulerConfig,
    /// `None` until a provider call has told us the budget.
    rate_limits: Option<RateLimits>,
    time_per_token: f64,
    jobs_processed: u64,
    calls_made: u64,
    signals: watch::Sender<SchedulerSnapshot>,
}

impl Scheduler {
    pub(crate) fn new(
        client: Arc<dyn Client>,
        config: SchedulerConfig,
        signals: watch::Sender<SchedulerSnapshot>,
    ) -> Self {
        Self {
            client,
            config,
            rate_limits: None,
            time_per_token: 0.0,
            jobs_processed: 0,
            calls_made: 0,
            signals,
        }
    }

    /// Drain the queue until every sender is gone.
    pub(crate) async fn run(mut self, mut jobs: mpsc::Receiver<BatchJob>) {
        while let Some(job) = jobs.recv().await {
            self.process(job).await;
        }
        debug!("job queue closed, batch worker exiting");
    }

    pub(crate) async fn process(&mut self, mut job: BatchJob) {
        let span = info_span!("batch_job", job_id = %job.id, objects = job.len());
        self.run_job(&mut job).instrument(span).await;
        debug!(
            job_id = %job.id,
            elapsed_ms = job.start_time.elapsed().as_millis() as u64,
            "batch job finished"
        );
        self.jobs_processed += 1;
        self.publish();
        job.complete();
    }

    async fn run_job(&mut self, job: &mut BatchJob) {
        let n = job.len();
        let mut idx = 0;
        let mut batch = SubBatch::with_capacity(n.min(self.config.max_objects_per_batch));

        // We don't know the provider's budget without a request, so send a small one.
        while idx < n && self.rate_limits.is_none() {
            if let Some(err) = job.ctx.err() {
                job.fail_unresolved(idx, err);
                return;
            }
            if job.skip[idx] {
                idx += 1;
                continue;
            }
            batch.push(idx, job.texts[idx].clone(), job.tokens[idx]);
            idx += 1;
            self.dispatch(job, &mut batch).await;
            if self.throttle(job, idx).await.is_break() {
                return;
            }
        }

        while idx < n {
            if let Some(err) = job.ctx.err() {
                let from = batch.first_index().unwrap_or(idx);
                let failed = job.fail_unresolved(from, err.clone());
                warn!(failed, error = %err, "batch stopped before completion");
                return;
            }
            if job.skip[idx] {
                idx += 1;
                continue;
            }

            let tokens = job.tokens[idx];
            let limits = *self
                .rate_limits
                .get_or_insert(self.config.fallback_rate_limits);

            // Only a reported bucket size can rule an object out.
            if let Some(limit) = limits.limit_tokens.filter(|l| tokens as u64 > *l) {
                job.fail(idx, ItemError::TooLong { tokens, limit });
                idx += 1;
                continue;
            }

            if batch.admits(
                tokens,
                limits.remaining_tokens,
                self.time_per_token,
                &self.config,
            ) {
                batch.push(idx, job.texts[idx].clone(), tokens);
                idx += 1;
                continue;
            }

            if batch.is_empty() {
                // A single object larger than what is left of the budget: wait
                // until enough of it refills. Assumes the provider refills
                // linearly over the reset window.
                if limits.reset_tokens.is_zero() || limits.limit_tokens == Some(0) {
                    job.fail(idx, ItemError::TokenBudgetExhausted);
                    idx += 1;
                    continue;
                }
                let wait = refill_wait(limits.reset_tokens, tokens, limits.limit_tokens);
                if !job.wait_ends_before_deadline(wait) {
                    job.fail(idx, ItemError::TooLongForDeadline { tokens });
                    idx += 1;
                    continue;
                }
                info!(
                    index = idx,
                    tokens,
                    wait_ms = wait.as_millis() as u64,
                    "waiting for token budget to refill"
                );
                tokio::time::sleep(wait).await;
                if let Some(rl) = self.rate_limits.as_mut() {
                    rl.credit_tokens(tokens as u64);
                }
                continue;
            }

            self.dispatch(job, &mut batch).await;
            if self.throttle(job, idx).await.is_break() {
                return;
            }
        }

        // The last objects may be skipped or too long, leaving a batch unsent.
        if !batch.is_empty() {
            self.dispatch(job, &mut batch).await;
        }
    }

    /// Send `batch`, merge its results into `job` and learn from the response.
    /// Leaves `batch` empty.
    async fn dispatch(&mut self, job: &mut BatchJob, batch: &mut SubBatch) {
        debug!(
            size = batch.len(),
            tokens = batch.tokens(),
            first_index = batch.first_index(),
            "dispatching sub-batch"
        );
        let start = Instant::now();
        let response = self
            .client
            .vectorize(&job.ctx, batch.texts(), &job.config)
            .await;
        let took = start.elapsed();
        self.calls_made += 1;

        match response {
            Ok(resp) => {
                job.apply_result(batch, resp.result);
                match resp.rate_limits {
                    Some(rl) => self.rate_limits = Some(rl),
                    None if self.rate_limits.is_none() => {
                        self.rate_limits = Some(self.config.fallback_rate_limits)
                    }
                    None => {}
                }
            }
            Err(e) => {
                warn!(size = batch.len(), error = %e, "sub-batch call failed");
                if let Some(rl) = e.rate_limits {
                    self.rate_limits = Some(rl);
                }
                job.fail_batch(batch, ItemError::Call(e));
            }
        }

        if batch.tokens() > 0 {
            self.time_per_token = took.as_secs_f64() / batch.tokens() as f64;
        }
        batch.clear();
        self.publish();
    }

    /// Wait out an exhausted request budget, or fail what is left of the job
    /// from `next` on when the wait would overrun its deadline.
    async fn throttle(&mut self, job: &mut BatchJob, next: usize) -> ControlFlow<()> {
        let Some(limits) = self.rate_limits else {
            return ControlFlow::Continue(());
        };
        // Not all limits show up here; free tiers only report per-day budgets.
        if !limits.requests_exhausted() {
            return ControlFlow::Continue(());
        }
        if job.would_exceed_deadline(limits.reset_requests) {
            let failed = job.fail_unresolved(next, ItemError::RateLimitExceeded);
            warn!(
                failed,
                reset_ms = limits.reset_requests.as_millis() as u64,
                "request budget exhausted and will not refresh in time"
            );
            return ControlFlow::Break(());
        }
        info!(
            reset_ms = limits.reset_requests.as_millis() as u64,
            "request budget exhausted, waiting for reset"
        );
        tokio::time::sleep(limits.reset_requests).await;
        if let Some(rl) = self.rate_limits.as_mut() {
            rl.remaining_requests = rl.limit_requests.unwrap_or(1).max(1);
            rl.reset_requests = Duration::ZERO;
        }
        ControlFlow::Continue(())
    }

    fn publish(&self) {
        self.signals.send_replace(SchedulerSnapshot {
            rate_limits: self.rate_limits,
            time_per_token: self.time_per_token,
            jobs_processed: self.jobs_processed,
            calls_made: self.calls_made,
        });
    }
}

/// Time for `tokens` of a `limit` sized bucket to refill, rounded up to the
/// millisecond. An unknown bucket size waits out the whole reset window.
fn refill_wait(reset: Duration, tokens: usize, limit: Option<u64>) -> Duration {
    let reset_ms = reset.as_millis();
    let limit = u128::from(limit.unwrap_or(tokens as u64).max(1));
    let ms = (reset_ms * tokens as u128 + limit - 1) / limit;
    Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX).max(1))
}
