//! Error types for chat orchestration.

use thiserror::Error;

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors raised while answering a chat request.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The inbound request cannot be served.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The chat endpoint answered with a non-success status.
    #[error("chat endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The summarization response carried no choices.
    #[error("chat endpoint returned no choices")]
    NoChoices,

    /// The streamed answer broke off.
    #[error("stream error: {0}")]
    Stream(String),

    /// Retrieval failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] lento_retrieval::RetrievalError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ChatError {
    /// Whether an outbound call ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Retrieval(lento_retrieval::RetrievalError::Embedding(
                lento_embeddings::EmbeddingError::Http(e),
            )) => e.is_timeout(),
            _ => false,
        }
    }
}
