//! Prompt templates for user memory extraction.

use crate::types::Message;

/// System message framing the extraction call.
pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "你是一个信息提取助手，专门从对话中提取用户偏好和背景信息。";

/// Build the user-side extraction prompt around the rendered conversation.
pub fn user_info_extraction_prompt(conversation: &str) -> String {
    format!(
        r#"你是一个信息提取助手。请从以下对话中提取用户信息，重点关注：
1. **用户偏好**（编程语言、工具、技术栈、话题偏好等）
2. **用户背景**（职业、工作经验、项目经历等）

对话内容：
{}

请以JSON格式返回提取的信息，只返回JSON，不要其他文字说明：
{{
    "preferences": {{
        "programming_languages": [],
        "tools": [],
        "topics": []
    }},
    "background": {{
        "profession": "",
        "experience": "",
        "projects": []
    }}
}}

如果对话中没有相关信息，请返回空值（空字符串或空列表）。"#,
        conversation
    )
}

/// The two messages sent for one extraction call.
pub fn build_extraction_messages(conversation: &str) -> Vec<Message> {
    vec![
        Message::system(EXTRACTION_SYSTEM_PROMPT),
        Message::user(user_info_extraction_prompt(conversation)),
    ]
}
