//! MCP server exposing retrieval and user memory as tools.
//!
//! Uses the rmcp SDK's macro-based approach for defining tools.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use tracing::debug;
use zhimi_core::{RetrievalEngine, UserMemoryManager};

use crate::tools::*;

/// MCP server for retrieval and user memory.
#[derive(Clone)]
pub struct ZhimiServer {
    retrieval: Arc<RetrievalEngine>,
    memory: Arc<UserMemoryManager>,
    default_user_id: String,
    tool_router: ToolRouter<ZhimiServer>,
}

#[tool_router]
impl ZhimiServer {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        memory: Arc<UserMemoryManager>,
        default_user_id: impl Into<String>,
    ) -> Self {
        Self {
            retrieval,
            memory,
            default_user_id: default_user_id.into(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    fn user_id(&self, requested: Option<String>) -> String {
        requested
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.default_user_id.clone())
    }

    #[tool(
        name = "simple_keyword_search",
        description = "简单关键词检索工具。适用于明确的术语、名称、具体关键词查询。当用户询问具体的名称、术语、关键词时使用此工具。例如：'知觅是什么'、'如何安装'、'配置文件位置'等。"
    )]
    async fn simple_keyword_search(
        &self,
        Parameters(input): Parameters<SearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let text = self.retrieval.simple_keyword_search(&input.query).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "hybrid_search",
        description = "混合检索工具（向量检索+关键词检索）。适用于需要理解语义、上下文、概念的问题。当用户询问需要理解含义、上下文关系、概念解释的问题时使用此工具。例如：'解释一下工作原理'、'它们之间的关系是什么'、'这个概念如何应用'等。"
    )]
    async fn hybrid_search(
        &self,
        Parameters(input): Parameters<SearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let text = self.retrieval.hybrid_search(&input.query).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Markdown summary of what is known about the user, empty when nothing is.
    #[tool(
        name = "memory_summary",
        description = "Render the user's remembered preferences and background as a Markdown summary suitable for a system prompt. Returns an empty string when nothing is known."
    )]
    async fn memory_summary(
        &self,
        Parameters(input): Parameters<UserInput>,
    ) -> Result<CallToolResult, McpError> {
        let user_id = self.user_id(input.user_id);
        let summary = self.memory.memory_summary(&user_id);
        Ok(CallToolResult::success(vec![Content::text(summary)]))
    }

    /// Extract user information from recent turns and merge it into memory.
    #[tool(
        name = "memory_update",
        description = "Extract the user's preferences and background from recent conversation turns and merge them into persistent memory. Turns are formatted as '用户: ...' or '助手: ...'."
    )]
    async fn memory_update(
        &self,
        Parameters(input): Parameters<UpdateMemoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let user_id = self.user_id(input.user_id);
        let updated = self
            .memory
            .user(&user_id)
            .update_from_conversation(&input.conversation)
            .await;
        debug!(user_id = %user_id, updated, "memory_update");

        json_result(&UpdateMemoryResult { updated })
    }

    #[tool(
        name = "memory_get",
        description = "Get the full stored profile for a user: preferences, background and last update time."
    )]
    async fn memory_get(
        &self,
        Parameters(input): Parameters<UserInput>,
    ) -> Result<CallToolResult, McpError> {
        let user_id = self.user_id(input.user_id);
        json_result(&self.memory.user(&user_id).get_all())
    }

    #[tool(
        name = "memory_clear",
        description = "Forget everything remembered about a user, resetting the profile to empty."
    )]
    async fn memory_clear(
        &self,
        Parameters(input): Parameters<UserInput>,
    ) -> Result<CallToolResult, McpError> {
        let user_id = self.user_id(input.user_id);
        let cleared = self.memory.user(&user_id).clear();
        json_result(&ClearMemoryResult { cleared })
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_handler]
impl ServerHandler for ZhimiServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Zhimi knowledge and memory server. Use simple_keyword_search for exact \
                 terms and names, hybrid_search for questions that need semantic context. \
                 Call memory_summary before answering to personalize the reply, and \
                 memory_update with the latest turns afterwards."
                    .to_string(),
            ),
        }
    }
}
