//! HTTP server implementation using Axum.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use lento_embeddings::{EmbeddingProvider, Reranker};
use lento_retrieval::{ContextRetriever, CorpusIndex, Retriever};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::{ChatClient, OpenAIChatClient};
use crate::config::ServerConfig;
use crate::orchestrator::ChatOrchestrator;
use crate::routes;
use crate::tool::RetrievalTool;

/// Shared state for the server.
pub struct AppState {
    pub orchestrator: ChatOrchestrator,
    pub tool: RetrievalTool,
    /// Corpus size reported by the health check.
    pub documents: usize,
}

impl AppState {
    /// Wire the orchestrator and the tool to one retriever.
    pub fn new(
        client: Arc<dyn ChatClient>,
        retriever: Arc<dyn ContextRetriever>,
        summary_model: impl Into<String>,
        topic: impl Into<String>,
        documents: usize,
    ) -> Self {
        Self {
            orchestrator: ChatOrchestrator::new(client, retriever.clone(), summary_model),
            tool: RetrievalTool::new(retriever, topic),
            documents,
        }
    }

    /// Load and embed the corpus, then connect the upstream clients.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let retrieval_config = config.retrieval_config();
        retrieval_config.validate()?;

        let http = reqwest::Client::new();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(config.embedder(http.clone()));
        let reranker: Arc<dyn Reranker> = Arc::new(config.reranker(http.clone()));

        let index = CorpusIndex::build(&retrieval_config, embedder.as_ref())
            .await
            .context("failed to build corpus index")?;
        let documents = index.len();

        let retriever = Retriever::new(Arc::new(index), embedder, reranker, &retrieval_config);
        let chat_config = config.chat_config();
        let client = OpenAIChatClient::new(&chat_config).with_client(http);

        Ok(Self::new(
            Arc::new(client),
            Arc::new(retriever),
            chat_config.summary_model,
            config.topic.clone(),
            documents,
        ))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(routes::chat_completions))
        .route("/v1/tools", get(routes::list_tools))
        .route(
            "/v1/tools/retrieve_documents",
            post(routes::retrieve_documents),
        )
        .route("/health", get(routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until Ctrl-C.
pub async fn start(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
