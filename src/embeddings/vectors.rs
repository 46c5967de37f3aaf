//! Vector operations for embeddings.

use super::types::Vector;
use crate::{Error, Result};

/// Element-wise mean of `vectors`.
///
/// Used to fold the chunk embeddings a provider returns for one long input
/// into the single vector callers expect.
pub fn combine_vectors(vectors: &[Vector]) -> Result<Vector> {
    if vectors.is_empty() {
        return Err(Error::validation("Cannot combine an empty list of vectors"));
    }
    let dim = vectors[0].len();
    if !vectors.iter().all(|v| v.len() == dim) {
        return Err(Error::validation("All vectors must have same dimensions"));
    }
    if vectors.len() == 1 {
        return Ok(vectors[0].clone());
    }
    let n = vectors.len() as f32;
    let mut result = vec![0.0; dim];
    for v in vectors {
        for (i, val) in v.iter().enumerate() {
            result[i] += val;
        }
    }
    for val in &mut result {
        *val /= n;
    }
    Ok(result)
}
