//! zhimi-llm - Chat model providers for zhimi.
//!
//! Both supported providers speak the OpenAI chat-completions protocol;
//! SiliconFlow is reached through its OpenAI-compatible endpoint.
//!
//! # Example
//!
//! ```ignore
//! use zhimi_llm::LlmFactory;
//!
//! // Qwen2.5-7B-Instruct on SiliconFlow, key from SILICONFLOW_API_KEY
//! let llm = LlmFactory::siliconflow()?;
//!
//! // Or from a loaded configuration
//! let llm = LlmFactory::from_config(&config.llm)?;
//! ```

mod factory;
mod openai;

pub use factory::LlmFactory;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use zhimi_core::config::{LlmProvider, LlmProviderConfig};
pub use zhimi_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
