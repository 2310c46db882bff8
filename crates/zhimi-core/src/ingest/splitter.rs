//! Recursive character splitter tuned for Chinese prose.
//!
//! Text is cut on the coarsest separator that occurs in it; pieces still
//! longer than the chunk size are cut again on the next separator, down to
//! single characters. Adjacent pieces are then packed into chunks of at most
//! `chunk_size` characters, with up to `chunk_overlap` characters repeated
//! between neighbours. All lengths are counted in characters, not bytes.

use std::collections::VecDeque;

use crate::config::IngestConfig;
use crate::error::{ZhimiError, ZhimiResult};
use crate::types::Chunk;

use super::loader::Document;

/// Paragraph, line, then Chinese sentence and clause punctuation.
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", "。", "！", "？", "；", "，"];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> ZhimiResult<Self> {
        if chunk_size == 0 {
            return Err(ZhimiError::validation("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(ZhimiError::validation_with_suggestion(
                format!(
                    "chunk_overlap ({}) must be smaller than chunk_size ({})",
                    chunk_overlap, chunk_size
                ),
                "Lower ingest.chunk_overlap",
            ));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &IngestConfig) -> ZhimiResult<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list (coarsest first).
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // First separator present in the text; an empty string means
        // character level.
        let position = separators
            .iter()
            .position(|s| !s.is_empty() && text.contains(s.as_str()));
        let (separator, rest) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if separator.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, rest));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }
        chunks
    }

    /// Pack small pieces into chunks, carrying an overlap tail forward.
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = Default::default();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window);

                while total > self.chunk_overlap
                    || (total > 0 && total + len > self.chunk_size)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.as_str(), len));
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }
}

/// Cut every document and turn the pieces into chunks.
pub fn split_documents(documents: &[Document], splitter: &TextSplitter) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            splitter
                .split_text(&doc.content)
                .into_iter()
                .enumerate()
                .map(move |(ordinal, text)| Chunk::from_source(&doc.source, ordinal, text))
        })
        .collect()
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split on `separator`, leaving it attached to the end of each piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    text.split_inclusive(separator)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(500, 100).is_ok());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(500, 100).unwrap();
        assert_eq!(splitter.split_text("  知觅是一个智能助手。 "), vec!["知觅是一个智能助手。"]);
    }

    #[test]
    fn test_sentences_keep_their_punctuation() {
        let splitter = TextSplitter::new(10, 3).unwrap();
        let chunks = splitter.split_text("一二三四五。六七八九十。甲乙丙丁戊。");
        assert_eq!(chunks, vec!["一二三四五。", "六七八九十。", "甲乙丙丁戊。"]);
    }

    #[test]
    fn test_character_fallback_with_overlap() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_long_paragraph_is_split_on_finer_separator() {
        let splitter = TextSplitter::new(8, 0).unwrap();
        let text = "短段落。\n\n这是一段比较长的话，需要再切分，才能放进去。";
        let chunks = splitter.split_text(text);

        assert_eq!(chunks[0], "短段落。");
        assert!(chunks.iter().all(|c| c.chars().count() <= 8));
        assert_eq!(chunks.concat().replace('\n', ""), text.replace('\n', ""));
    }

    #[test]
    fn test_no_chunk_exceeds_size() {
        let splitter = TextSplitter::new(50, 10).unwrap();
        let text = "第一句话。第二句话比较长一些，有逗号，还有分号；最后一句！".repeat(20);
        for chunk in splitter.split_text(&text) {
            assert!(chunk.chars().count() <= 50, "chunk too long: {}", chunk);
        }
    }

    #[test]
    fn test_split_documents_assigns_sources() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let docs = vec![
            Document::new("a.txt", "abcdefghij"),
            Document::new("b.md", "xy"),
        ];
        let chunks = split_documents(&docs, &splitter);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].source.as_deref(), Some("a.txt"));
        assert_eq!(chunks[3].content, "xy");
        assert_ne!(chunks[0].id, chunks[1].id);
    }
}
