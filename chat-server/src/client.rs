//! Client for the upstream chat-completion endpoint.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Data payload that ends an upstream stream.
pub const DONE: &str = "[DONE]";

/// Upstream SSE `data` payloads, excluding the terminating [`DONE`].
pub type FrameStream = BoxStream<'static, Result<String>>;

/// An OpenAI-style chat-completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a non-streaming request and return the first choice's content.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String>;

    /// Send a streaming request.
    ///
    /// Errors before the first byte (transport, status) are returned here;
    /// later failures arrive as items of the stream.
    async fn stream(&self, request: &ChatCompletionRequest) -> Result<FrameStream>;
}

/// [`ChatClient`] over HTTP.
#[derive(Clone)]
pub struct OpenAIChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    complete_timeout: Duration,
    stream_timeout: Duration,
}

impl OpenAIChatClient {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
            complete_timeout: config.summary_timeout,
            stream_timeout: config.answer_timeout,
        }
    }

    /// Use a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(timeout)
            .json(request);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String> {
        debug!("chat completion with model {}", request.model);
        let response = self.send(request, self.complete_timeout).await?;

        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatError::NoChoices)
    }

    async fn stream(&self, request: &ChatCompletionRequest) -> Result<FrameStream> {
        debug!("streaming chat completion with model {}", request.model);
        let response = self.send(request, self.stream_timeout).await?;

        let frames = response
            .bytes_stream()
            .eventsource()
            .map_err(|e| ChatError::Stream(e.to_string()))
            .map_ok(|event| event.data)
            .try_take_while(|data| futures::future::ready(Ok(data.trim() != DONE)));

        Ok(frames.boxed())
    }
}
