//! zhimi-embeddings - Embedding providers for zhimi.
//!
//! # Example
//!
//! ```ignore
//! use zhimi_embeddings::EmbedderFactory;
//!
//! // BAAI/bge-large-zh-v1.5 on SiliconFlow
//! let embedder = EmbedderFactory::siliconflow()?;
//!
//! let embedder = EmbedderFactory::from_config(&config.embedder)?;
//! ```

mod factory;
mod openai;

pub use factory::EmbedderFactory;
pub use openai::OpenAIEmbedder;

// Re-export core types for convenience
pub use zhimi_core::config::EmbedderProviderConfig;
pub use zhimi_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};
