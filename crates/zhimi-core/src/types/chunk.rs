//! Indexed text chunks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A contiguous span of source text stored in the document index.
///
/// The embedding for a chunk is owned by the index and never travels with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier (md5 of source, position and content).
    pub id: String,
    /// Raw chunk text.
    pub content: String,
    /// Path or name of the document the chunk was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Opaque source metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    /// Create a chunk whose id is derived from its content alone.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: chunk_id(None, 0, &content),
            content,
            source: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a chunk cut from `source` at position `ordinal`.
    pub fn from_source(source: impl Into<String>, ordinal: usize, content: impl Into<String>) -> Self {
        let source = source.into();
        let content = content.into();
        Self {
            id: chunk_id(Some(&source), ordinal, &content),
            content,
            source: Some(source),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is closer).
    pub score: f32,
}

fn chunk_id(source: Option<&str>, ordinal: usize, content: &str) -> String {
    let key = format!("{}\u{1f}{}\u{1f}{}", source.unwrap_or(""), ordinal, content);
    format!("{:x}", md5::compute(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        let a = Chunk::from_source("docs/a.md", 0, "知觅是一个智能助手");
        let b = Chunk::from_source("docs/a.md", 0, "知觅是一个智能助手");
        let c = Chunk::from_source("docs/a.md", 1, "知觅是一个智能助手");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 32);
    }
}
