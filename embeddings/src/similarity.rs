//! Similarity computation for embeddings.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// A corpus position together with its similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Position in the corpus the score was computed against.
    pub position: usize,

    /// Cosine similarity to the query.
    pub score: f32,
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Euclidean norm of `v`, rejecting vectors whose self dot product is not
/// strictly positive.
fn norm(v: &[f32], label: impl FnOnce() -> String) -> Result<f32> {
    let self_dot: f32 = v.iter().map(|x| x * x).sum();
    if self_dot.is_nan() || self_dot <= 0.0 {
        return Err(EmbeddingError::ZeroVector(label()));
    }
    Ok(self_dot.sqrt())
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0. A zero vector on either side is an
/// error rather than a zero score, since the ratio is undefined.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let norm_a = norm(a, || "first".to_string())?;
    let norm_b = norm(b, || "second".to_string())?;
    Ok(dot / norm_a / norm_b)
}

/// Rank `corpus` by cosine similarity to `query` and keep the best `n`.
///
/// The result holds `min(n, corpus.len())` candidates sorted by descending
/// score. Equal scores keep ascending corpus position.
pub fn top_similar(query: &[f32], corpus: &[Embedding], n: usize) -> Result<Vec<ScoredCandidate>> {
    let query_norm = norm(query, || "query".to_string())?;

    let mut scores = Vec::with_capacity(corpus.len());
    for (position, embedding) in corpus.iter().enumerate() {
        let dot = dot_product(query, embedding)?;
        let embedding_norm = norm(embedding, || format!("corpus {position}"))?;
        scores.push(ScoredCandidate {
            position,
            score: dot / query_norm / embedding_norm,
        });
    }

    scores.sort_by_key(|candidate| Reverse(OrderedFloat(candidate.score)));
    scores.truncate(n);

    Ok(scores)
}
