//! Retrieval limits and the fixed user-facing advisory strings.

use serde::{Deserialize, Serialize};

/// Returned by both strategies when the index (or ranker) has not been built.
pub const INDEX_NOT_BUILT: &str = "⚠️ 本地知识库尚未构建，请先构建索引。";

/// Returned when the index is present but yields nothing for the query.
pub const NO_LOCAL_INFO: &str = "未找到相关本地信息。";

/// Returned by keyword search when no chunk contains any query term.
pub const NO_KEYWORD_MATCH: &str = "未找到包含相关关键词的本地信息。";

/// Separator placed between chunk contents in a rendered result.
pub const RESULT_DELIMITER: &str = "\n\n---\n\n";

/// Configuration for retrieval operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum chunks returned by keyword search.
    pub keyword_top_k: usize,
    /// Chunks taken from semantic search in hybrid mode.
    pub semantic_k: usize,
    /// Chunks taken from the lexical ranker in hybrid mode.
    pub lexical_k: usize,
    /// Separator between chunk contents.
    pub delimiter: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_top_k: 3,
            semantic_k: 2,
            lexical_k: 2,
            delimiter: RESULT_DELIMITER.to_string(),
        }
    }
}
