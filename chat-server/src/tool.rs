//! The `retrieve_documents` function tool.
//!
//! Lets a tool-calling model run retrieval itself with a question it has
//! already condensed, skipping the summarization stage.

use std::sync::Arc;

use lento_retrieval::ContextRetriever;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

pub const TOOL_NAME: &str = "retrieve_documents";

const QUESTION_DESCRIPTION: &str =
    "用户提出的原始问题。如果是多轮回话，请分析上下文后给出最终的完整问题。";

/// Arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolArguments {
    pub question: String,
}

/// A tool call body: the arguments themselves, or the OpenAI `arguments`
/// string wrapping them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolCall {
    Direct(ToolArguments),
    Wrapped { arguments: String },
}

impl ToolCall {
    pub fn into_arguments(self) -> serde_json::Result<ToolArguments> {
        match self {
            Self::Direct(arguments) => Ok(arguments),
            Self::Wrapped { arguments } => serde_json::from_str(&arguments),
        }
    }
}

/// Result of a tool call; `None` when retrieval failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub result: Option<String>,
}

pub struct RetrievalTool {
    retriever: Arc<dyn ContextRetriever>,
    topic: String,
}

impl RetrievalTool {
    pub fn new(retriever: Arc<dyn ContextRetriever>, topic: impl Into<String>) -> Self {
        Self {
            retriever,
            topic: topic.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("当用户查询{}问题时调用此函数", self.topic)
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": QUESTION_DESCRIPTION
                }
            },
            "required": ["question"]
        })
    }

    /// Tool definition in OpenAI function format.
    pub fn definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": TOOL_NAME,
                "description": self.description(),
                "parameters": Self::input_schema()
            }
        })
    }

    /// Retrieve context for `arguments.question`. Failures are logged, not returned.
    pub async fn call(&self, arguments: ToolArguments) -> ToolResult {
        info!("tool call: {}", arguments.question);
        match self.retriever.retrieve(&arguments.question).await {
            Ok(context) => ToolResult {
                result: Some(context),
            },
            Err(e) => {
                error!("retrieval tool failed: {e}");
                ToolResult { result: None }
            }
        }
    }
}
