//! Configuration system for zhimi.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ZhimiError, ZhimiResult};
use crate::retrieval::RetrievalConfig;
use crate::traits::{EmbedderConfig, EmbedderProvider, LlmConfig};

/// SiliconFlow's OpenAI-compatible endpoint.
pub const SILICONFLOW_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Default chat model served by SiliconFlow.
pub const DEFAULT_LLM_MODEL: &str = "Qwen2.5-7B-Instruct";

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    SiliconFlow,
    OpenAI,
}

impl LlmProvider {
    /// Environment variable holding the API key for this provider.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::SiliconFlow => "SILICONFLOW_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Base URL used when the config does not set one.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::SiliconFlow => Some(SILICONFLOW_BASE_URL),
            LlmProvider::OpenAI => None,
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::SiliconFlow,
            config: LlmConfig {
                model: DEFAULT_LLM_MODEL.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

impl Default for EmbedderProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::SiliconFlow,
            config: EmbedderConfig::default(),
        }
    }
}

/// User memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Memory table location; defaults to `<data_dir>/user_memory.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// Number of most recent turns handed to the extractor.
    pub conversation_window: usize,
    /// Deadline for a single extraction call to the LLM.
    pub extraction_timeout_secs: u64,
    /// User id used when a caller does not name one.
    pub default_user_id: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            conversation_window: 6,
            extraction_timeout_secs: 30,
            default_user_id: "default_user".to_string(),
        }
    }
}

impl MemoryConfig {
    /// Extraction deadline as a [`Duration`].
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// File extensions picked up by the loader.
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            extensions: vec!["txt".to_string(), "md".to_string(), "markdown".to_string()],
        }
    }
}

/// Main zhimi configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZhimiConfig {
    /// Directory holding the chunk index and memory table.
    pub data_dir: PathBuf,
    /// Chunk index location; defaults to `<data_dir>/chunks.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Embedder configuration.
    pub embedder: EmbedderProviderConfig,
    /// Retrieval limits.
    pub retrieval: RetrievalConfig,
    /// User memory settings.
    pub memory: MemoryConfig,
    /// Ingestion settings.
    pub ingest: IngestConfig,
}

impl Default for ZhimiConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("memory"),
            index_path: None,
            llm: LlmProviderConfig::default(),
            embedder: EmbedderProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
            memory: MemoryConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl ZhimiConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> ZhimiResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ZhimiError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ZhimiError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| ZhimiError::Configuration(e.to_string())),
            _ => Err(ZhimiError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from the environment.
    ///
    /// `ZHIMI_CONFIG` names a file to start from; the remaining variables
    /// override individual settings on top of it.
    pub fn from_env() -> ZhimiResult<Self> {
        let mut config = match std::env::var("ZHIMI_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("ZHIMI_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.config.model = model;
        }
        if let Ok(model) = std::env::var("EMBED_MODEL") {
            config.embedder.config.model = model;
        }

        let key_env = config.llm.provider.api_key_env();
        if let Ok(api_key) = std::env::var(key_env).or_else(|_| std::env::var("OPENAI_API_KEY")) {
            if config.llm.config.api_key.is_none() {
                config.llm.config.api_key = Some(api_key.clone());
            }
            if config.embedder.config.api_key.is_none() {
                config.embedder.config.api_key = Some(api_key);
            }
        }

        Ok(config)
    }

    /// Resolved chunk index path.
    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("chunks.db"))
    }

    /// Resolved memory table path.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .storage_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("user_memory.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_product_settings() {
        let config = ZhimiConfig::default();
        assert_eq!(config.llm.provider, LlmProvider::SiliconFlow);
        assert_eq!(config.llm.config.model, "Qwen2.5-7B-Instruct");
        assert_eq!(config.embedder.config.model, "BAAI/bge-large-zh-v1.5");
        assert_eq!(config.retrieval.keyword_top_k, 3);
        assert_eq!(config.memory.conversation_window, 6);
        assert_eq!(config.index_path(), PathBuf::from("memory/chunks.db"));
        assert_eq!(config.memory_path(), PathBuf::from("memory/user_memory.json"));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zhimi.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/zhimi"

[llm]
provider = "openai"
model = "gpt-4o-mini"

[retrieval]
semantic_k = 4

[memory]
extraction_timeout_secs = 5
"#,
        )
        .unwrap();

        let config = ZhimiConfig::from_file(&path).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.llm.config.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.semantic_k, 4);
        assert_eq!(config.retrieval.lexical_k, 2);
        assert_eq!(config.memory.extraction_timeout(), Duration::from_secs(5));
        assert_eq!(config.memory_path(), PathBuf::from("/var/lib/zhimi/user_memory.json"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zhimi.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            ZhimiConfig::from_file(&path),
            Err(ZhimiError::Configuration(_))
        ));
    }

    #[test]
    fn test_provider_env_names() {
        assert_eq!(LlmProvider::SiliconFlow.api_key_env(), "SILICONFLOW_API_KEY");
        assert_eq!(LlmProvider::OpenAI.default_base_url(), None);
    }
}
