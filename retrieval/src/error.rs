//! Error types for corpus loading and retrieval.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while loading the corpus or retrieving context.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding, ranking or rerank error.
    #[error("embedding error: {0}")]
    Embedding(#[from] lento_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A summary manifest line carries an identifier that is not an integer.
    #[error("{}:{line}: invalid document id {id:?}", path.display())]
    InvalidDocId {
        path: PathBuf,
        line: usize,
        id: String,
    },

    /// A document named by the manifest could not be read.
    #[error("failed to read document {doc_id} at {}: {source}", path.display())]
    DocumentRead {
        doc_id: i64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Documents and embeddings do not line up.
    #[error("corpus misaligned: {documents} documents but {embeddings} embeddings")]
    Misaligned { documents: usize, embeddings: usize },

    /// A rerank result pointed at a candidate that was not submitted.
    #[error("rerank returned unknown candidate {0}")]
    UnknownCandidate(usize),

    /// IO error.
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
