//! Server configuration.
//!
//! Every setting can be given as a flag or through the environment (a `.env`
//! file is loaded by the binary before parsing).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lento_embeddings::{HttpReranker, OpenAIProvider};
use lento_retrieval::RetrievalConfig;

/// Default chat-completion base URL, also the default for embeddings.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/v1";

#[derive(Parser, Clone)]
#[command(
    name = "lento-chat-server",
    version,
    about = "OpenAI-compatible chat endpoint that answers from a document corpus"
)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 13000)]
    pub port: u16,

    /// Base URL of the chat-completion endpoint.
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub llm_base_url: String,

    /// Bearer token for the chat-completion endpoint.
    #[arg(long, env = "LLM_TOKEN", default_value = "", hide_env_values = true)]
    pub llm_token: String,

    /// Base URL of the embedding and rerank endpoints.
    #[arg(long, env = "EMB_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub emb_base_url: String,

    /// Bearer token for the embedding and rerank endpoints.
    #[arg(long, env = "EMB_TOKEN", default_value = "", hide_env_values = true)]
    pub emb_token: String,

    /// Model used to condense the conversation into one question.
    #[arg(
        long,
        env = "MODEL_WITHOUT_THINKING",
        default_value = "Qwen/Qwen2.5-7B-Instruct"
    )]
    pub model_without_thinking: String,

    /// Embedding model.
    #[arg(long, env = "MODEL_EMB", default_value = "BAAI/bge-m3")]
    pub model_emb: String,

    /// Rerank model.
    #[arg(long, env = "MODEL_RERANK", default_value = "BAAI/bge-reranker-v2-m3")]
    pub model_rerank: String,

    /// Candidates kept by cosine similarity.
    #[arg(long, env = "TOP_EMB", default_value_t = 25)]
    pub top_emb: usize,

    /// Documents kept after reranking.
    #[arg(long, env = "TOP_RERANK", default_value_t = 5)]
    pub top_rerank: usize,

    /// Manifest of `<docId>:<summary>` lines.
    #[arg(long, env = "SUMMARY_FILE", default_value = "./summary.txt")]
    pub summary_file: PathBuf,

    /// Directory of `<docId>.md` files and `files.txt`.
    #[arg(long, env = "MARKDOWN_DIR", default_value = "./markdown")]
    pub markdown_dir: PathBuf,

    /// Subject named in the retrieval tool description.
    #[arg(long, env = "TOPIC", default_value = "所有")]
    pub topic: String,

    /// Timeout for embedding and rerank calls, in seconds.
    #[arg(long, env = "EMB_TIMEOUT_SECS", default_value_t = 60)]
    pub emb_timeout_secs: u64,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::new(self.summary_file.clone(), self.markdown_dir.clone())
            .with_top_emb(self.top_emb)
            .with_top_rerank(self.top_rerank)
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            base_url: self.llm_base_url.clone(),
            api_key: self.llm_token.clone(),
            summary_model: self.model_without_thinking.clone(),
            ..ChatConfig::default()
        }
    }

    pub fn embedder(&self, client: reqwest::Client) -> OpenAIProvider {
        OpenAIProvider::new(&self.emb_base_url)
            .with_client(client)
            .with_api_key(self.emb_token.clone())
            .with_model(self.model_emb.clone())
            .with_timeout(Duration::from_secs(self.emb_timeout_secs))
    }

    pub fn reranker(&self, client: reqwest::Client) -> HttpReranker {
        HttpReranker::new(&self.emb_base_url)
            .with_client(client)
            .with_api_key(self.emb_token.clone())
            .with_model(self.model_rerank.clone())
            .with_timeout(Duration::from_secs(self.emb_timeout_secs))
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_token", &redact(&self.llm_token))
            .field("emb_base_url", &self.emb_base_url)
            .field("emb_token", &redact(&self.emb_token))
            .field("model_without_thinking", &self.model_without_thinking)
            .field("model_emb", &self.model_emb)
            .field("model_rerank", &self.model_rerank)
            .field("top_emb", &self.top_emb)
            .field("top_rerank", &self.top_rerank)
            .field("summary_file", &self.summary_file)
            .field("markdown_dir", &self.markdown_dir)
            .field("topic", &self.topic)
            .field("emb_timeout_secs", &self.emb_timeout_secs)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

/// Settings for the upstream chat-completion endpoint.
#[derive(Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,

    /// Model for the non-streaming summarization call.
    pub summary_model: String,

    pub summary_timeout: Duration,

    /// Covers the whole streamed answer, body included.
    pub answer_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            summary_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            summary_timeout: Duration::from_secs(60),
            answer_timeout: Duration::from_secs(300),
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("summary_model", &self.summary_model)
            .field("summary_timeout", &self.summary_timeout)
            .field("answer_timeout", &self.answer_timeout)
            .finish()
    }
}
