//! Factory for creating LLM providers.

use std::sync::Arc;

use tracing::info;
use zhimi_core::config::{LlmProvider, LlmProviderConfig, DEFAULT_LLM_MODEL};
use zhimi_core::error::{ZhimiError, ZhimiResult};
use zhimi_core::traits::{Llm, LlmConfig};

use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    ///
    /// Unset fields are filled from the provider's defaults: base URL,
    /// model, and the API key from the provider's environment variable.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> ZhimiResult<Arc<dyn Llm>> {
        let config = Self::resolve(provider, config)?;
        info!(?provider, model = %config.model, "Creating LLM provider");
        Ok(Arc::new(OpenAIProvider::new(config)?))
    }

    /// Create an LLM provider from a provider-tagged config section.
    pub fn from_config(config: &LlmProviderConfig) -> ZhimiResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// SiliconFlow with the default chat model.
    pub fn siliconflow() -> ZhimiResult<Arc<dyn Llm>> {
        Self::siliconflow_with_model(DEFAULT_LLM_MODEL)
    }

    /// SiliconFlow with a specific model.
    pub fn siliconflow_with_model(model: impl Into<String>) -> ZhimiResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::SiliconFlow, config)
    }

    /// OpenAI with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> ZhimiResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }

    fn resolve(provider: LlmProvider, mut config: LlmConfig) -> ZhimiResult<LlmConfig> {
        if config.model.is_empty() {
            config.model = DEFAULT_LLM_MODEL.to_string();
        }
        if config.base_url.is_none() {
            config.base_url = provider.default_base_url().map(str::to_string);
        }
        if config.api_key.is_none() {
            let env = provider.api_key_env();
            config.api_key = Some(std::env::var(env).map_err(|_| {
                ZhimiError::Configuration(format!(
                    "API key not found. Set {} or provide api_key in config.",
                    env
                ))
            })?);
        }
        Ok(config)
    }
}
