//! OpenAI-compatible embedding provider.

use async_trait::async_trait;
use tracing::debug;

use zhimi_core::error::{ZhimiError, ZhimiResult};
use zhimi_core::traits::{Embedder, EmbedderConfig};

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};

/// Embedding provider for OpenAI and SiliconFlow `/embeddings` endpoints.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
}

impl OpenAIEmbedder {
    /// Create a new embedder. The key comes from `config.api_key`, falling
    /// back to `OPENAI_API_KEY`.
    pub fn new(config: EmbedderConfig) -> ZhimiResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ZhimiError::Configuration(
                    "API key not found. Set SILICONFLOW_API_KEY or OPENAI_API_KEY, or provide api_key in config.".to_string(),
                )
            })?;

        let openai_config = match config.base_url {
            Some(ref base_url) => OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        let mut config = config;
        config.batch_size = config.batch_size.max(1);

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    async fn request(&self, input: EmbeddingInput, expected: usize) -> ZhimiResult<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input,
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ZhimiError::Embedding {
                message: format!("Embedding request failed: {}", e),
                code: zhimi_core::ErrorCode::EmbConnectionFailed,
                source: Some(Box::new(e)),
            })?;

        // Results carry their input position; do not trust response order.
        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        if data.len() != expected {
            return Err(ZhimiError::embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> ZhimiResult<Vec<f32>> {
        let mut vectors = self
            .request(EmbeddingInput::String(text.to_string()), 1)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| ZhimiError::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> ZhimiResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            let vectors = self
                .request(EmbeddingInput::StringArray(batch.to_vec()), batch.len())
                .await?;
            embeddings.extend(vectors);
            debug!(done = embeddings.len(), total = texts.len(), "Embedded batch");
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dims
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
