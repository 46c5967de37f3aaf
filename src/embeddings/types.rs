//! Embedding call results.

use crate::error::ItemError;
use crate::resilience::RateLimits;

pub type Vector = Vec<f32>;

/// Index-aligned outcome of one provider call: for input `i`, `errors[i]` says
/// why it failed, otherwise `vectors[i]` holds its embedding. Failed inputs
/// keep a placeholder (usually empty) vector so indices stay aligned.
///
/// For a single input the provider may split the text into chunks and return
/// several vectors; callers of the single-object path combine them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorizationResult {
    pub texts: Vec<String>,
    pub dimensions: usize,
    pub vectors: Vec<Vector>,
    pub errors: Vec<Option<ItemError>>,
}

impl VectorizationResult {
    /// Every input succeeded.
    pub fn from_vectors(texts: Vec<String>, vectors: Vec<Vector>) -> Self {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        let errors = vec![None; vectors.len()];
        Self {
            texts,
            dimensions,
            vectors,
            errors,
        }
    }

    /// Mark input `index` as failed.
    pub fn with_error(mut self, index: usize, error: ItemError) -> Self {
        if self.errors.len() <= index {
            self.errors.resize(index + 1, None);
        }
        self.errors[index] = Some(error);
        self
    }

    pub fn error(&self, index: usize) -> Option<&ItemError> {
        self.errors.get(index).and_then(Option::as_ref)
    }

    pub fn vector(&self, index: usize) -> Option<&Vector> {
        self.vectors.get(index)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// A completed provider call: results plus the budget the provider reported.
#[derive(Debug, Clone, Default)]
pub struct VectorizeResponse {
    pub result: VectorizationResult,
    pub rate_limits: Option<RateLimits>,
}

impl VectorizeResponse {
    pub fn new(result: VectorizationResult) -> Self {
        Self {
            result,
            rate_limits: None,
        }
    }

    pub fn with_rate_limits(mut self, rate_limits: RateLimits) -> Self {
        self.rate_limits = Some(rate_limits);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vectors_aligns_errors() {
        let res = VectorizationResult::from_vectors(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        );
        assert_eq!(res.dimensions, 2);
        assert_eq!(res.errors, vec![None, None]);
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn test_with_error_grows_error_list() {
        let res = VectorizationResult::default().with_error(2, ItemError::provider("bad input"));
        assert_eq!(res.errors.len(), 3);
        assert!(res.error(0).is_none());
        assert_eq!(res.error(2), Some(&ItemError::provider("bad input")));
    }
}
