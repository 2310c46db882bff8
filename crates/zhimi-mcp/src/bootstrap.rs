//! Wiring from configuration to a running server or a freshly built index.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zhimi_core::{
    load_documents, split_documents, Embedder, Llm, RetrievalEngine, SqliteChunkIndex,
    TextSplitter, UserMemoryManager, ZhimiConfig,
};
use zhimi_embeddings::EmbedderFactory;
use zhimi_llm::LlmFactory;

use crate::server::ZhimiServer;

/// Log to stderr; stdout carries the MCP transport.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Build the server with providers constructed from `config`.
pub async fn build_server(config: &ZhimiConfig) -> Result<ZhimiServer> {
    let llm = LlmFactory::from_config(&config.llm).context("creating LLM provider")?;
    let embedder =
        EmbedderFactory::from_config(&config.embedder).context("creating embedder")?;
    build_server_with(config, llm, embedder).await
}

/// Build the server around the given providers.
///
/// A missing or empty index is not fatal: the retrieval tools answer with
/// the "index not built" advisory until `zhimi-index` has been run.
pub async fn build_server_with(
    config: &ZhimiConfig,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
) -> Result<ZhimiServer> {
    let index_path = config.index_path();
    let index = Arc::new(
        SqliteChunkIndex::open(&index_path, embedder)
            .with_context(|| format!("opening chunk index at {}", index_path.display()))?,
    );

    let retrieval = if index.is_empty()? {
        warn!(path = %index_path.display(), "Chunk index is empty; run zhimi-index first");
        RetrievalEngine::new(config.retrieval.clone())
    } else {
        RetrievalEngine::from_index(index, config.retrieval.clone())
            .await
            .context("building lexical ranker")?
    };

    let memory_path = config.memory_path();
    let memory = UserMemoryManager::from_config(&config.memory, &memory_path, llm)
        .with_context(|| format!("opening memory table at {}", memory_path.display()))?;
    info!(
        index = %index_path.display(),
        memory = %memory_path.display(),
        ready = retrieval.is_ready(),
        "Server state initialized"
    );

    Ok(ZhimiServer::new(
        Arc::new(retrieval),
        Arc::new(memory),
        config.memory.default_user_id.clone(),
    ))
}

/// Load every document under `source_dir`, split it and replace the chunk
/// index. Returns the number of chunks written.
pub async fn build_index(
    config: &ZhimiConfig,
    source_dir: &Path,
    embedder: Arc<dyn Embedder>,
) -> Result<usize> {
    let documents = load_documents(source_dir, &config.ingest.extensions)?;
    let splitter = TextSplitter::from_config(&config.ingest)?;
    let chunks = split_documents(&documents, &splitter);
    info!(documents = documents.len(), chunks = chunks.len(), "Split documents");

    let index = SqliteChunkIndex::open(config.index_path(), embedder)?
        .with_batch_size(config.embedder.config.batch_size);
    let written = index.rebuild(&chunks).await?;
    Ok(written)
}
