//! Question-to-context retrieval pipeline.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use lento_embeddings::{EmbeddingProvider, Reranker, top_similar};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::corpus::{CorpusIndex, DocId, Document};
use crate::error::{Result, RetrievalError};

/// Turns a standalone question into the context block handed to the model.
///
/// The chat completion route and the tool route share one implementation.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Retrieve and format the documents most relevant to `question`.
    async fn retrieve(&self, question: &str) -> Result<String>;
}

/// Embed, cosine-rank and rerank against an immutable [`CorpusIndex`].
pub struct Retriever {
    index: Arc<CorpusIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    top_emb: usize,
    top_rerank: usize,
}

impl Retriever {
    pub fn new(
        index: Arc<CorpusIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            reranker,
            top_emb: config.top_emb,
            top_rerank: config.top_rerank,
        }
    }

    /// Run the three ranking stages and return the selected documents in
    /// rerank order.
    pub async fn retrieve_documents(&self, question: &str) -> Result<Vec<&Document>> {
        info!("question: {question}");

        let query = self.embedder.embed_one(question).await?;
        let candidates = top_similar(&query, self.index.embeddings(), self.top_emb)?;

        let candidate_docs = candidates
            .iter()
            .map(|c| {
                self.index
                    .document(c.position)
                    .ok_or(RetrievalError::UnknownCandidate(c.position))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("embedding stage: {:?}", doc_ids(&candidate_docs));

        let summaries: Vec<String> = candidate_docs.iter().map(|d| d.summary.clone()).collect();
        let reranked = self
            .reranker
            .rerank(question, &summaries, self.top_rerank)
            .await?;

        let selected = reranked
            .iter()
            .take(self.top_rerank)
            .map(|r| {
                candidate_docs
                    .get(r.position)
                    .copied()
                    .ok_or(RetrievalError::UnknownCandidate(r.position))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("rerank stage: {:?}", doc_ids(&selected));

        for doc in &selected {
            debug!("selected doc {}: {}", doc.doc_id, doc.title);
        }

        Ok(selected)
    }
}

#[async_trait]
impl ContextRetriever for Retriever {
    async fn retrieve(&self, question: &str) -> Result<String> {
        let documents = self.retrieve_documents(question).await?;
        Ok(format_context(&documents))
    }
}

fn doc_ids(documents: &[&Document]) -> Vec<DocId> {
    documents.iter().map(|d| d.doc_id).collect()
}

/// Render documents as the numbered context block.
pub fn format_context(documents: &[&Document]) -> String {
    let mut out = format!("检索到以下{}篇文档：\n\n", documents.len());
    for (i, doc) in documents.iter().enumerate() {
        let _ = write!(out, "第{}篇文档", i + 1);
        if !doc.title.is_empty() {
            let _ = write!(out, "，标题为「{}」", doc.title);
        }
        let _ = write!(out, "：\n\n{}\n\n", doc.content);
    }
    out
}
