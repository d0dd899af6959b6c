//! docqa HTTP server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server
//! Set `DOCQA_CONFIG` to a TOML file to override the defaults.

use docqa::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("DOCQA_CONFIG").ok().map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - Feedback log: {}", config.paths.feedback_log.display());

    // Builds the index first when it is missing or stale
    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/query     - Ask a question");
    println!("  POST /api/feedback  - Rate the sources shown for a question");
    println!("  POST /api/upload    - Upload documents and rebuild the index");
    println!("  POST /api/reingest  - Rebuild the index");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
