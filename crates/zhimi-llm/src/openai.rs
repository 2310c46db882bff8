//! OpenAI-compatible chat provider.

use async_trait::async_trait;
use tracing::{debug, instrument};

use zhimi_core::error::{ZhimiError, ZhimiResult};
use zhimi_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use zhimi_core::types::{Message, MessageRole};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};

/// Chat provider for any endpoint that implements the OpenAI
/// chat-completions API (OpenAI itself, SiliconFlow).
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// Create a provider. The key comes from `config.api_key`, falling back
    /// to `OPENAI_API_KEY`.
    pub fn new(config: LlmConfig) -> ZhimiResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ZhimiError::Configuration(
                    "API key not found. Set SILICONFLOW_API_KEY or OPENAI_API_KEY, or provide api_key in config.".to_string(),
                )
            })?;

        if config.model.is_empty() {
            return Err(ZhimiError::Configuration(
                "LLM model name must not be empty".to_string(),
            ));
        }

        let openai_config = match config.base_url {
            Some(ref base_url) => OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    /// Endpoint this provider talks to, if not the OpenAI default.
    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }

    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: msg.name.clone(),
                })
            }
            MessageRole::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: msg.name.clone(),
                    ..Default::default()
                })
            }
            // Tool output is fed back as user text; no tool-call ids are tracked.
            MessageRole::User | MessageRole::Tool => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: msg.name.clone(),
                })
            }
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: GenerationOptions,
    ) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::message_to_openai).collect(),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            top_p: Some(options.top_p.unwrap_or(self.config.top_p)),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    #[instrument(skip(self, messages, options), fields(model = %self.config.model))]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> ZhimiResult<LlmResponse> {
        let request = self.build_request(messages, options.unwrap_or_default());

        let response = self.client.chat().create(request).await.map_err(|e| {
            ZhimiError::Llm {
                message: format!("Chat completion request failed: {}", e),
                code: zhimi_core::ErrorCode::LlmConnectionFailed,
                source: Some(Box::new(e)),
            }
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ZhimiError::llm("No response choices returned"))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(ref usage) = usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        Ok(LlmResponse {
            content: choice.message.content,
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            model: "Qwen2.5-7B-Instruct".to_string(),
            api_key: Some("sk-test".to_string()),
            base_url: Some("https://api.siliconflow.cn/v1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_with_explicit_key() {
        let llm = OpenAIProvider::new(config()).unwrap();
        assert_eq!(llm.model_name(), "Qwen2.5-7B-Instruct");
        assert_eq!(llm.base_url(), Some("https://api.siliconflow.cn/v1"));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = config();
        config.model.clear();
        assert!(matches!(
            OpenAIProvider::new(config),
            Err(ZhimiError::Configuration(_))
        ));
    }

    #[test]
    fn test_message_roles_map_to_chat_roles() {
        let mapped: Vec<ChatCompletionRequestMessage> = [
            Message::system("你是信息抽取助手"),
            Message::user("我是后端工程师"),
            Message::assistant("好的"),
        ]
        .iter()
        .map(OpenAIProvider::message_to_openai)
        .collect();

        assert!(matches!(mapped[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(mapped[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(mapped[2], ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_request_uses_overrides_then_config() {
        let llm = OpenAIProvider::new(config()).unwrap();
        let request = llm.build_request(
            &[Message::user("hi")],
            GenerationOptions {
                temperature: Some(0.0),
                ..Default::default()
            },
        );

        assert_eq!(request.model, "Qwen2.5-7B-Instruct");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(2000));
        assert_eq!(request.messages.len(), 1);
    }
}
