//! LLM-driven extraction of user preferences and background.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::MemoryConfig;
use crate::error::{ZhimiError, ZhimiResult};
use crate::traits::{Llm, LlmResponse};
use crate::types::{to_turns, Message};

use super::json_parser::parse_structured_info;
use super::profile::StructuredInfo;
use super::prompts::build_extraction_messages;

/// Characters of a bad response echoed into the log.
const LOG_PREVIEW_CHARS: usize = 200;

/// Extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Number of most recent turns sent to the model.
    pub window: usize,
    /// Deadline for the model call.
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window: 6,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&MemoryConfig> for ExtractorConfig {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            window: config.conversation_window,
            timeout: config.extraction_timeout(),
        }
    }
}

/// Turns conversation text into a [`StructuredInfo`] record.
///
/// Extraction never fails: model errors, timeouts and unparseable output all
/// produce the empty sentinel.
pub struct MemoryExtractor {
    llm: Arc<dyn Llm>,
    config: ExtractorConfig,
}

impl MemoryExtractor {
    pub fn new(llm: Arc<dyn Llm>, config: ExtractorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract from `"<role>: <text>"` turns, oldest first.
    #[instrument(skip(self, conversation), fields(turns = conversation.len()))]
    pub async fn extract_user_info(&self, conversation: &[String]) -> StructuredInfo {
        if conversation.is_empty() {
            return StructuredInfo::default();
        }

        let start = conversation.len().saturating_sub(self.config.window);
        let text = conversation[start..].join("\n");
        let messages = build_extraction_messages(&text);

        let response = match self.call_model(&messages).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, code = e.code().as_str(), "User info extraction call failed");
                return StructuredInfo::default();
            }
        };

        let content = response.text();
        match parse_structured_info(content) {
            Ok(info) => {
                debug!(has_info = info.has_info(), "Extracted user info");
                info
            }
            Err(e) => {
                let preview: String = content.chars().take(LOG_PREVIEW_CHARS).collect();
                warn!(error = %e, response = %preview, "Unusable extraction response");
                StructuredInfo::default()
            }
        }
    }

    /// One model call bounded by the configured deadline.
    async fn call_model(&self, messages: &[Message]) -> ZhimiResult<LlmResponse> {
        tokio::time::timeout(self.config.timeout, self.llm.generate(messages, None))
            .await
            .map_err(|_| {
                ZhimiError::timeout(format!(
                    "extraction exceeded {:.1}s",
                    self.config.timeout.as_secs_f64()
                ))
            })?
    }

    /// Extract from chat messages; the user speaks as 用户, every other role
    /// as 助手.
    pub async fn extract_from_messages(&self, messages: &[Message]) -> StructuredInfo {
        self.extract_user_info(&to_turns(messages)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::traits::GenerationOptions;
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub(crate) const GO_ENGINEER: &str = r#"{"preferences":{"programming_languages":["Go"],"tools":[],"topics":[]},"background":{"profession":"后端工程师","experience":"","projects":[]}}"#;

    /// Scripted model that records every prompt it receives.
    pub(crate) struct MockLlm {
        reply: Result<String, String>,
        delay: Option<Duration>,
        pub(crate) seen: Mutex<Vec<Vec<Message>>>,
    }

    impl MockLlm {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn slow(reply: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::replying(reply)
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Llm for MockLlm {
        async fn generate(
            &self,
            messages: &[Message],
            _: Option<GenerationOptions>,
        ) -> ZhimiResult<LlmResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(LlmResponse::text_only(text.clone())),
                Err(msg) => Err(ZhimiError::llm(msg.clone())),
            }
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn extractor(llm: Arc<MockLlm>) -> MemoryExtractor {
        MemoryExtractor::new(llm, ExtractorConfig::default())
    }

    fn turns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_extracts_model_fields() {
        let llm = Arc::new(MockLlm::replying(GO_ENGINEER));
        let info = extractor(llm)
            .extract_user_info(&turns(&["用户: 我是后端工程师，喜欢用Go"]))
            .await;

        assert_eq!(info.preferences.programming_languages, vec!["Go"]);
        assert_eq!(info.background.profession, "后端工程师");
        assert!(info.has_info());
    }

    #[tokio::test]
    async fn test_empty_conversation_skips_model() {
        let llm = Arc::new(MockLlm::replying(GO_ENGINEER));
        let info = extractor(llm.clone()).extract_user_info(&[]).await;
        assert_eq!(info, StructuredInfo::default());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_only_recent_window_is_sent() {
        let llm = Arc::new(MockLlm::replying("{}"));
        let conversation: Vec<String> = (0..10).map(|i| format!("用户: 第{}句", i)).collect();
        extractor(llm.clone()).extract_user_info(&conversation).await;

        let seen = llm.seen.lock().unwrap();
        let prompt = &seen[0][1].content;
        assert!(!prompt.contains("第3句"));
        assert!(prompt.contains("用户: 第4句\n用户: 第5句"));
        assert!(prompt.contains("第9句"));
    }

    #[tokio::test]
    async fn test_model_error_yields_sentinel() {
        let llm = Arc::new(MockLlm::failing("503 Service Unavailable"));
        let info = extractor(llm).extract_user_info(&turns(&["用户: hi"])).await;
        assert_eq!(info, StructuredInfo::default());
    }

    #[tokio::test]
    async fn test_non_json_yields_sentinel() {
        let llm = Arc::new(MockLlm::replying("I could not find anything."));
        let info = extractor(llm).extract_user_info(&turns(&["用户: hi"])).await;
        assert_eq!(info, StructuredInfo::default());
    }

    #[tokio::test]
    async fn test_timeout_yields_sentinel() {
        let llm = Arc::new(MockLlm::slow(GO_ENGINEER, Duration::from_secs(5)));
        let extractor = MemoryExtractor::new(
            llm,
            ExtractorConfig {
                window: 6,
                timeout: Duration::from_millis(50),
            },
        );
        let info = extractor.extract_user_info(&turns(&["用户: hi"])).await;
        assert_eq!(info, StructuredInfo::default());
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_timeout_error() {
        let llm = Arc::new(MockLlm::slow(GO_ENGINEER, Duration::from_secs(5)));
        let extractor = MemoryExtractor::new(
            llm,
            ExtractorConfig {
                window: 6,
                timeout: Duration::from_millis(20),
            },
        );
        let err = extractor
            .call_model(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ZhimiError::Timeout { .. }));
        assert_eq!(err.code(), ErrorCode::NetTimeout);
    }

    #[tokio::test]
    async fn test_mistyped_section_yields_sentinel() {
        let llm = Arc::new(MockLlm::replying(
            r#"{"preferences": null, "background": {"profession": "工程师"}}"#,
        ));
        let info = extractor(llm)
            .extract_user_info(&turns(&["用户: 我是工程师"]))
            .await;
        assert_eq!(info, StructuredInfo::default());
    }

    #[tokio::test]
    async fn test_extract_from_messages_labels_roles() {
        let llm = Arc::new(MockLlm::replying(GO_ENGINEER));
        extractor(llm.clone())
            .extract_from_messages(&[
                Message::user("我喜欢Go"),
                Message::assistant("好的"),
            ])
            .await;

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0][1].content.contains("用户: 我喜欢Go\n助手: 好的"));
    }
}
