//! Sub-batch accumulation.

use crate::config::SchedulerConfig;

/// Contiguous run of objects from one job, sent to the provider in one call.
#[derive(Debug, Default)]
pub(crate) struct SubBatch {
    texts: Vec<String>,
    indices: Vec<usize>,
    tokens: usize,
}

impl SubBatch {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            texts: Vec::with_capacity(n),
            indices: Vec::with_capacity(n),
            tokens: 0,
        }
    }

    /// Whether an object of `tokens` tokens may join without breaking the
    /// token budget, the projected-time ceiling or the size cap.
    ///
    /// Time and size are judged on the batch as it is, so an empty batch only
    /// ever rejects on tokens.
    pub(crate) fn admits(
        &self,
        tokens: usize,
        remaining_tokens: u64,
        time_per_token: f64,
        cfg: &SchedulerConfig,
    ) -> bool {
        let budget = cfg.token_budget_ratio * remaining_tokens as f64;
        let within_tokens = ((self.tokens + tokens) as f64) < budget;
        let within_time = self.is_empty()
            || time_per_token * (self.tokens as f64) < cfg.max_time_per_batch.as_secs_f64();
        let within_size = self.is_empty() || self.len() < cfg.max_objects_per_batch;
        within_tokens && within_time && within_size
    }

    pub(crate) fn push(&mut self, index: usize, text: String, tokens: usize) {
        self.texts.push(text);
        self.indices.push(index);
        self.tokens += tokens;
    }

    pub(crate) fn texts(&self) -> &[String] {
        &self.texts
    }

    pub(crate) fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub(crate) fn tokens(&self) -> usize {
        self.tokens
    }

    pub(crate) fn first_index(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.indices.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.texts.clear();
        self.indices.clear();
        self.tokens = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn filled(tokens: &[usize]) -> SubBatch {
        let mut b = SubBatch::with_capacity(tokens.len());
        for (i, t) in tokens.iter().enumerate() {
            b.push(i, format!("t{}", i), *t);
        }
        b
    }

    #[test]
    fn test_token_budget_uses_safety_margin() {
        let cfg = SchedulerConfig::default();
        let b = filled(&[10]);
        // 20 < 0.95 * 25 = 23.75
        assert!(b.admits(10, 25, 0.0, &cfg));
        // 24 >= 23.75
        assert!(!b.admits(14, 25, 0.0, &cfg));
        assert!(!SubBatch::default().admits(24, 25, 0.0, &cfg));
    }

    #[test]
    fn test_projected_time_ceiling() {
        let cfg = SchedulerConfig::default().with_max_time_per_batch(Duration::from_secs(10));
        let b = filled(&[100]);
        // 0.05 s/token * 100 tokens = 5 s
        assert!(b.admits(1, u64::MAX, 0.05, &cfg));
        // 0.2 s/token * 100 tokens = 20 s
        assert!(!b.admits(1, u64::MAX, 0.2, &cfg));
        // an empty batch is never held back by timing
        assert!(SubBatch::default().admits(1_000, u64::MAX, 10.0, &cfg));
    }

    #[test]
    fn test_size_cap() {
        let cfg = SchedulerConfig::default().with_max_objects_per_batch(2);
        assert!(filled(&[1]).admits(1, u64::MAX, 0.0, &cfg));
        assert!(!filled(&[1, 1]).admits(1, u64::MAX, 0.0, &cfg));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut b = filled(&[3, 4]);
        assert_eq!(b.tokens(), 7);
        assert_eq!(b.first_index(), Some(0));
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.tokens(), 0);
        assert_eq!(b.first_index(), None);
        assert!(b.texts().is_empty());
    }
}
