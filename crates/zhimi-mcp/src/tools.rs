//! MCP tool input/output type definitions.
//!
//! These types are used with `schemars::JsonSchema` to generate the JSON Schema
//! that MCP clients use to understand tool parameters.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Input for the retrieval tools.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// 用户问题或查询关键词
    pub query: String,
}

/// Input for tools that address one user's memory.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserInput {
    /// User whose memory is addressed. Defaults to the configured user.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Input for memory_update tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryInput {
    /// User whose memory is updated. Defaults to the configured user.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Conversation turns, oldest first, each rendered as "<role>: <text>".
    /// Only the most recent turns are sent to the extractor.
    pub conversation: Vec<String>,
}

/// Result of memory_update.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMemoryResult {
    /// Whether anything new was committed.
    pub updated: bool,
}

/// Result of memory_clear.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ClearMemoryResult {
    /// Whether the profile was reset.
    pub cleared: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_input_schema_carries_query_description() {
        let schema = rmcp::schemars::schema_for!(SearchInput);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("query"));
        assert!(json.contains("用户问题或查询关键词"));
    }

    #[test]
    fn test_user_input_defaults_to_no_user() {
        let input: UserInput = serde_json::from_str("{}").unwrap();
        assert!(input.user_id.is_none());
    }

    #[test]
    fn test_update_input_requires_conversation() {
        assert!(serde_json::from_str::<UpdateMemoryInput>(r#"{"user_id": "u1"}"#).is_err());

        let input: UpdateMemoryInput =
            serde_json::from_str(r#"{"conversation": ["用户: 我喜欢用Go"]}"#).unwrap();
        assert_eq!(input.conversation.len(), 1);
        assert!(input.user_id.is_none());
    }
}
