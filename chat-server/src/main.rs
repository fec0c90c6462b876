//! Lento chat server.
//!
//! Usage:
//!   lento-chat-server                          # settings from the environment / .env
//!   lento-chat-server --port 8080 --verbose    # override any setting with a flag

use anyhow::Result;
use clap::Parser;
use lento_chat_server::ServerConfig;
use lento_chat_server::server::{self, AppState};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();
    let config = ServerConfig::parse();

    let filter = if config.verbose {
        "lento=debug,tower_http=debug"
    } else {
        "lento=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    debug!("{config:?}");

    let state = AppState::from_config(&config).await?;
    info!("loaded {} documents", state.documents);

    server::start(state, config.port).await
}
