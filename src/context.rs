//! Request context: cooperative cancellation plus an optional deadline.

use crate::error::ItemError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline carried by every vectorization request.
///
/// Cloning shares the cancellation token, so cancelling any clone cancels the
/// request everywhere it travels (caller, queue, scheduler, client).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now. A timeout beyond what the
    /// clock can represent leaves the context without a deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::new().with_deadline(deadline),
            None => Self::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `None` while the request is still live, otherwise the reason it is not.
    pub fn err(&self) -> Option<ItemError> {
        if self.token.is_cancelled() {
            return Some(ItemError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ItemError::DeadlineExceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_context() {
        let ctx = RequestContext::new();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_clones_and_children() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        let child = ctx.child();
        ctx.cancel();
        assert_eq!(clone.err(), Some(ItemError::Cancelled));
        assert_eq!(child.err(), Some(ItemError::Cancelled));
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let ctx = RequestContext::new();
        let child = ctx.child();
        child.cancel();
        assert!(ctx.err().is_none());
        assert!(child.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(2));
        assert!(ctx.err().is_none());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ctx.err(), Some(ItemError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_deadline_wins() {
        let now = Instant::now();
        let ctx = RequestContext::new()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(20));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_has_no_deadline() {
        let ctx = RequestContext::with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());
    }
}
