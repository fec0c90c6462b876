//! # Lento Retrieval
//!
//! Loads the document corpus once at startup and answers questions with a
//! formatted context block:
//!
//! ```text
//! question ──▶ embed ──▶ cosine top_emb ──▶ rerank top_rerank ──▶ context
//!                               ▲
//!                          CorpusIndex
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lento_retrieval::{CorpusIndex, RetrievalConfig, Retriever};
//!
//! let config = RetrievalConfig::new("./summary.txt", "./markdown");
//! let index = CorpusIndex::build(&config, embedder.as_ref()).await?;
//! let retriever = Retriever::new(Arc::new(index), embedder, reranker, &config);
//!
//! let context = retriever.retrieve("How do I file an expense?").await?;
//! ```

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;

pub use config::RetrievalConfig;
pub use corpus::{CorpusIndex, DocId, Document, load_documents};
pub use engine::{ContextRetriever, Retriever, format_context};
pub use error::{Result, RetrievalError};
