//! Factory for creating embedding providers.

use std::sync::Arc;

use tracing::info;
use zhimi_core::config::EmbedderProviderConfig;
use zhimi_core::error::{ZhimiError, ZhimiResult};
use zhimi_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

use crate::openai::OpenAIEmbedder;

/// Factory for creating embedding providers.
pub struct EmbedderFactory;

impl EmbedderFactory {
    /// Create an embedder from the given configuration, filling the base
    /// URL and API key from provider defaults when unset.
    pub fn create(
        provider: EmbedderProvider,
        config: EmbedderConfig,
    ) -> ZhimiResult<Arc<dyn Embedder>> {
        let config = Self::resolve(provider, config)?;
        info!(?provider, model = %config.model, "Creating embedder");
        Ok(Arc::new(OpenAIEmbedder::new(config)?))
    }

    /// Create an embedder from a provider-tagged config section.
    pub fn from_config(config: &EmbedderProviderConfig) -> ZhimiResult<Arc<dyn Embedder>> {
        Self::create(config.provider, config.config.clone())
    }

    /// SiliconFlow with the default Chinese embedding model.
    pub fn siliconflow() -> ZhimiResult<Arc<dyn Embedder>> {
        Self::create(EmbedderProvider::SiliconFlow, EmbedderConfig::default())
    }

    /// OpenAI with a specific model.
    pub fn openai_with_model(
        model: impl Into<String>,
        dims: usize,
    ) -> ZhimiResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            ..Default::default()
        };
        Self::create(EmbedderProvider::OpenAI, config)
    }

    fn resolve(provider: EmbedderProvider, mut config: EmbedderConfig) -> ZhimiResult<EmbedderConfig> {
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
