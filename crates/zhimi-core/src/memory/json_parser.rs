//! JSON parsing utilities for LLM responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ZhimiError, ZhimiResult};

use super::profile::StructuredInfo;

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[a-zA-Z0-9]*\n?([\s\S]*?)\n?```$").expect("valid regex"));

static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

// Greedy: first '{' through last '}'.
static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

/// Remove an enclosing code fence and any thinking tags from a response.
pub fn remove_code_blocks(content: &str) -> String {
    let content = content.trim();

    let content = CODE_FENCE_RE
        .captures(content)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim()))
        .unwrap_or(content);

    THINK_RE.replace_all(content, "").trim().to_string()
}

/// The span from the first `{` to the last `}`, or the whole text if there is
/// no such span.
pub fn extract_json(text: &str) -> &str {
    JSON_OBJECT_RE
        .find(text)
        .map(|m| m.as_str())
        .unwrap_or(text)
}

/// Parse an extraction response into [`StructuredInfo`].
///
/// Fails when no JSON can be decoded, the top level is not an object, or a
/// `preferences`/`background` section is present but not an object. Mistyped
/// fields inside a well-shaped section fall back to empty values.
pub fn parse_structured_info(response: &str) -> ZhimiResult<StructuredInfo> {
    let cleaned = remove_code_blocks(response);
    let json_str = extract_json(&cleaned);

    let parsed: Value = serde_json::from_str(json_str).map_err(|e| {
        ZhimiError::parse(format!("Failed to parse extraction JSON: {}", e))
    })?;

    let object = match parsed {
        Value::Object(object) => object,
        other => {
            return Err(ZhimiError::parse(format!(
                "Extraction JSON is not an object: {}",
                other
            )))
        }
    };

    for section in ["preferences", "background"] {
        match object.get(section) {
            None | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(ZhimiError::parse(format!(
                    "Extraction section `{}` is not an object: {}",
                    section, other
                )))
            }
        }
    }

    Ok(StructuredInfo::from_object(&object))
}
