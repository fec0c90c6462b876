//! # Lento Chat Server
//!
//! An OpenAI-compatible `/v1/chat/completions` endpoint that answers every
//! conversation from a fixed document corpus. The conversation is condensed
//! into one question, the question is run through the retrieval pipeline,
//! and the caller's model streams an answer grounded in the retrieved
//! documents.
//!
//! The same retrieval is exposed as a `retrieve_documents` function tool for
//! clients that do their own tool calling.

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod routes;
pub mod server;
pub mod sse;
pub mod tool;
pub mod types;

pub use client::{ChatClient, FrameStream, OpenAIChatClient};
pub use config::{ChatConfig, ServerConfig};
pub use error::{ChatError, Result};
pub use orchestrator::ChatOrchestrator;
pub use server::{AppState, build_router};
pub use tool::RetrievalTool;
pub use types::{ChatCompletionRequest, ChatMessage, Role};
