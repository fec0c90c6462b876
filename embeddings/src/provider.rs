//! Embedding providers.
//!
//! The only transport is an OpenAI-compatible `/embeddings` endpoint, but
//! callers depend on the [`EmbeddingProvider`] trait so a caching or retrying
//! wrapper can be slotted in without touching the retrieval pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model this provider embeds with.
    fn model(&self) -> &str;

    /// Embed a batch of texts.
    ///
    /// The output holds exactly one vector per input text, in input order.
    /// An empty batch is rejected before any request is made.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }
}

/// OpenAI-compatible embedding provider.
pub struct OpenAIProvider {
    /// API key, sent as a bearer token when present.
    api_key: Option<String>,

    /// API base URL, e.g. `http://127.0.0.1:8080/v1`.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model identifier sent with every request.
    model: String,

    /// Per-request timeout.
    timeout: Option<Duration>,
}

impl OpenAIProvider {
    /// Create a new provider for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            model: "BAAI/bge-m3".to_string(),
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

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {api_key}"));
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        req
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!(
            "Generating embeddings for {} texts with model: {}",
            texts.len(),
            self.model
        );

        let body = OpenAIEmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .request(format!("{}/embeddings", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "embedding endpoint returned {status}: {error_text}"
            )));
        }

        let bytes = response.bytes().await?;
        let result: OpenAIEmbeddingResponse = serde_json::from_slice(&bytes)?;

        if result.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: result.data.len(),
            });
        }

        let embeddings = order_by_index(result.data)?;
        info!(
            "Generated {} embeddings with {} dimensions",
            embeddings.len(),
            embeddings.first().map_or(0, Vec::len)
        );

        Ok(embeddings)
    }
}

/// Place each returned vector at the position its `index` names.
///
/// Servers that omit `index` are taken to answer in input order.
fn order_by_index(data: Vec<OpenAIEmbeddingData>) -> Result<Vec<Embedding>> {
    let mut slots: Vec<Option<Embedding>> = vec![None; data.len()];

    for (position, item) in data.into_iter().enumerate() {
        let index = item.index.unwrap_or(position);
        let slot = slots.get_mut(index).ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!("embedding index {index} out of range"))
        })?;
        if slot.replace(item.embedding).is_some() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "duplicate embedding index {index}"
            )));
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding index".to_string()))
}

/// OpenAI API request format.
#[derive(Debug, Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}
