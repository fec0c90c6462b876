//! # Embeddings
//!
//! Remote embedding and rerank clients plus in-memory cosine ranking for the
//! Lento retrieval pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► top_similar ──► Reranker   │
//! │       │                                                 │       │
//! │       ▼                                                 ▼       │
//! │  /embeddings                                        /rerank     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod rerank;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, OpenAIProvider};
pub use rerank::{HttpReranker, RerankResult, Reranker};
pub use similarity::{ScoredCandidate, cosine_similarity, top_similar};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
