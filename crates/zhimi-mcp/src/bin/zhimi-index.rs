//! Build the chunk index from a directory of documents.
//!
//! Usage: `zhimi-index [SOURCE_DIR]` (default `./data`). The index is
//! written to the configured index path, replacing any previous contents.

use std::path::PathBuf;

use anyhow::Result;
use zhimi_core::ZhimiConfig;
use zhimi_embeddings::EmbedderFactory;
use zhimi_mcp::{build_index, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let source_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    let config = ZhimiConfig::from_env()?;
    let embedder = EmbedderFactory::from_config(&config.embedder)?;

    tracing::info!(source = %source_dir.display(), index = %config.index_path().display(), "Building index");
    let written = build_index(&config, &source_dir, embedder).await?;
    tracing::info!(chunks = written, "Index built");

    Ok(())
}
