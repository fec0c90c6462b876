//! Rerank providers.
//!
//! A reranker scores a small candidate set against a query with a
//! cross-encoder hosted behind an HTTP endpoint. Positions in the result
//! index the documents passed in, not any global corpus.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EmbeddingError, Result};

/// One reranked document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    /// Position in the `documents` slice given to [`Reranker::rerank`].
    pub position: usize,

    /// Relevance score reported by the endpoint.
    pub relevance_score: f32,
}

/// Trait for rerank providers.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Get the model this reranker scores with.
    fn model(&self) -> &str;

    /// Order `documents` by relevance to `query`, keeping at most `top_n`.
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
    -> Result<Vec<RerankResult>>;
}

/// Reranker backed by a `/rerank` endpoint (Jina/Cohere/TEI style).
pub struct HttpReranker {
    /// API key, sent as a bearer token when present.
    api_key: Option<String>,

    /// API base URL; `/rerank` is appended.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model identifier.
    model: String,

    /// Per-request timeout.
    timeout: Option<Duration>,
}

impl HttpReranker {
    /// Create a new reranker for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            model: "BAAI/bge-reranker-v2-m3".to_string(),
            timeout: None,
        }
    }

    /// Set the API key. An empty key disables the authorization header.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bound every request by the given timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share an existing HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    fn model(&self) -> &str {
        &self.model
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Reranking {} documents with model: {}",
            documents.len(),
            self.model
        );

        let body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let mut req = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {api_key}"));
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "rerank endpoint returned {status}: {error_text}"
            )));
        }

        let bytes = response.bytes().await?;
        let parsed: RerankResponse = serde_json::from_slice(&bytes)?;

        let mut seen = vec![false; documents.len()];
        parsed
            .results
            .into_iter()
            .map(|item| {
                let Some(slot) = seen.get_mut(item.index) else {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "rerank index {} out of range for {} documents",
                        item.index,
                        documents.len()
                    )));
                };
                if *slot {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "duplicate rerank index {}",
                        item.index
                    )));
                }
                *slot = true;
                Ok(RerankResult {
                    position: item.index,
                    relevance_score: item.relevance_score,
                })
            })
            .collect()
    }
}

/// Rerank API request format.
#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

/// Rerank API response format.
#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}
