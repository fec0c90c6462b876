//! Chat request orchestration.
//!
//! One inbound request passes through three upstream calls in order:
//!
//! 1. a non-streaming completion that condenses the conversation into one
//!    standalone question,
//! 2. retrieval of the context for that question,
//! 3. a streaming completion with the caller's model that answers the
//!    question from the context.
//!
//! Any failure aborts the remaining stages.

use std::fmt::Write as _;
use std::sync::Arc;

use lento_retrieval::ContextRetriever;
use tracing::info;

use crate::client::{ChatClient, FrameStream};
use crate::error::{ChatError, Result};
use crate::types::{ChatCompletionRequest, ChatMessage, Role};

/// System prompt for the summarization call.
pub const SUMMARIZE_PROMPT: &str = "请根据以下提供的聊天记录历史，总结出一条用户的原始问题。";

pub struct ChatOrchestrator {
    client: Arc<dyn ChatClient>,
    retriever: Arc<dyn ContextRetriever>,
    summary_model: String,
}

impl ChatOrchestrator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        retriever: Arc<dyn ContextRetriever>,
        summary_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            retriever,
            summary_model: summary_model.into(),
        }
    }

    /// Run summarization and retrieval, then open the answer stream.
    pub async fn answer(&self, request: ChatCompletionRequest) -> Result<FrameStream> {
        let final_request = self.prepare(request).await?;
        self.client.stream(&final_request).await
    }

    /// Build the streaming request sent for the final answer.
    pub async fn prepare(&self, request: ChatCompletionRequest) -> Result<ChatCompletionRequest> {
        let Some(first) = request.messages.first() else {
            return Err(ChatError::BadRequest("messages must not be empty".to_string()));
        };
        let system_prompt = if first.role == Role::System {
            first.content.clone()
        } else {
            String::new()
        };

        let question = self
            .client
            .complete(&self.summarization_request(&request))
            .await?;
        info!("summarized question: {question}");

        let context = self.retriever.retrieve(&question).await?;

        Ok(answer_request(request, system_prompt, &question, &context))
    }

    fn summarization_request(&self, request: &ChatCompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.summary_model.clone(),
            messages: vec![
                ChatMessage::system(SUMMARIZE_PROMPT),
                ChatMessage::user(transcript(&request.messages)),
            ],
            stream: Some(false),
            extra: request.extra.clone(),
        }
    }
}

/// Render every non-system message as a numbered transcript line.
///
/// Numbers are positions in the full message list, system messages included.
pub fn transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for (index, message) in messages.iter().enumerate() {
        if message.role == Role::System {
            continue;
        }
        let _ = write!(
            out,
            "{index}. [role={}] {}\n\n",
            message.role, message.content
        );
    }
    out
}

fn answer_request(
    request: ChatCompletionRequest,
    system_prompt: String,
    question: &str,
    context: &str,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model,
        messages: vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(format!(
                "请根据以下检索到的信息，回答用户的原始问题：{question}\n\n{context}"
            )),
        ],
        stream: Some(true),
        extra: request.extra,
    }
}
