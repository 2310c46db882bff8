//! Chat message types exchanged with the language model and the chat loop.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// Speaker label used when a conversation is rendered as `"<role>: <text>"`
    /// turns. Only the user speaks as "用户"; everything else is the assistant
    /// side of the dialogue.
    pub fn speaker_label(&self) -> &'static str {
        match self {
            MessageRole::User => "用户",
            MessageRole::System | MessageRole::Assistant | MessageRole::Tool => "助手",
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Set the name field.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Render as a single conversation turn, e.g. `"用户: 你好"`.
    pub fn as_turn(&self) -> String {
        format!("{}: {}", self.role.speaker_label(), self.content)
    }
}

/// Render messages into `"<role>: <text>"` turns, oldest first.
pub fn to_turns(messages: &[Message]) -> Vec<String> {
    messages.iter().map(Message::as_turn).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_labels() {
        let turns = to_turns(&[
            Message::user("我是后端工程师"),
            Message::assistant("好的"),
            Message::system("规则"),
        ]);
        assert_eq!(turns, vec!["用户: 我是后端工程师", "助手: 好的", "助手: 规则"]);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert!(json.contains("\"assistant\""));
        assert!(!json.contains("name"));
    }
}
