//! zhimi-core - Core library for zhimi.
//!
//! This crate provides hybrid retrieval over a local document index and a
//! structured per-user memory that is built up from conversation.
//!
//! # Example
//!
//! ```ignore
//! use zhimi_core::{RetrievalConfig, RetrievalEngine, SqliteChunkIndex, UserMemoryManager};
//!
//! let index = Arc::new(SqliteChunkIndex::open("memory/chunks.db", embedder)?);
//! let engine = RetrievalEngine::from_index(index, RetrievalConfig::default()).await?;
//! let context = engine.hybrid_search("知觅怎么安装").await;
//!
//! let memory = UserMemoryManager::from_config(&config.memory, config.memory_path(), llm)?;
//! memory.update_from_messages("default_user", &messages).await;
//! let summary = memory.memory_summary("default_user");
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod memory;
pub mod retrieval;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{IngestConfig, LlmProvider, MemoryConfig, ZhimiConfig};
pub use error::{ErrorCode, ZhimiError, ZhimiResult};
pub use index::SqliteChunkIndex;
pub use ingest::{load_documents, split_documents, Document, TextSplitter};
pub use memory::{
    MemoryExtractor, StructuredInfo, UserMemory, UserMemoryManager, UserMemoryStorage,
    UserProfile,
};
pub use retrieval::{RetrievalConfig, RetrievalEngine, TantivyRanker};
pub use traits::{
    DocumentIndex, Embedder, EmbedderConfig, EmbedderProvider, LexicalRanker, Llm, LlmConfig,
    LlmResponse,
};
pub use types::{Chunk, Message, MessageRole, ScoredChunk};
