//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while embedding, ranking or reranking.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// An embedding batch was requested with no texts.
    #[error("embedding input is empty")]
    EmptyInput,

    /// API request failed with a non-success status.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The endpoint returned a different number of vectors than texts sent.
    #[error("embedding length mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector has a non-positive self dot product, so its cosine is undefined.
    #[error("{0} embedding is zero")]
    ZeroVector(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
