use crate::resilience::RateLimits;

/// A snapshot of runtime "signals" for orchestration and monitoring.
///
/// This is intentionally *facts only* (no policy).
#[derive(Debug, Clone, Default)]
pub struct SignalsSnapshot {
    pub scheduler: SchedulerSnapshot,
    pub queue: QueueSnapshot,
}

/// Published by the batch worker after every provider call and every job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerSnapshot {
    /// Last budget learned from the provider; `None` until the first call returns.
    pub rate_limits: Option<RateLimits>,
    /// Seconds per token observed on the last call.
    pub time_per_token: f64,
    pub jobs_processed: u64,
    pub calls_made: u64,
}

impl SchedulerSnapshot {
    pub fn bootstrapped(&self) -> bool {
        self.rate_limits.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub capacity: usize,
    pub queued: usize,
}
