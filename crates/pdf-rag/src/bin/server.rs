//! RAG Server binary
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-server

use pdf_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // RAG_CONFIG points at a TOML file; RAG_HOST / RAG_PORT override the bind address
    let config = RagConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Uploads: {}", config.storage.upload_dir.display());
    tracing::info!("  - Indexes: {}", config.storage.index_dir.display());
    tracing::info!("  - Model cache: {}", config.embeddings.cache_dir.display());
    tracing::info!(
        "  - Chunking: {} tokens, {} overlap",
        config.chunking.max_tokens,
        config.chunking.overlap_tokens
    );

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  GET    /config          - Providers and models");
    println!("  POST   /upload          - Upload a PDF");
    println!("  POST   /chat            - Ask a question");
    println!("  GET    /documents       - List documents");
    println!("  DELETE /documents/:id   - Delete a document");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
