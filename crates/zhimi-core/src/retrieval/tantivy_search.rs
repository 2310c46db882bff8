//! Tantivy full-text ranking with BM25 scoring.
//!
//! The ranker is built once from the complete chunk collection into an
//! in-RAM index and is read-only afterwards.

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::debug;

use crate::error::{ZhimiError, ZhimiResult};
use crate::traits::LexicalRanker;
use crate::types::Chunk;

/// Writer heap for the one-shot build.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Result from text search with BM25 score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSearchResult {
    /// Chunk that matched.
    pub chunk: Chunk,
    /// BM25 relevance score (unbounded, higher = more relevant).
    pub bm25_score: f32,
}

/// Tantivy-backed lexical ranker over indexed chunks.
pub struct TantivyRanker {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    content_field: Field,
    source_field: Field,
}

impl TantivyRanker {
    /// Build the ranker from every chunk in the document index.
    pub fn build(chunks: &[Chunk]) -> ZhimiResult<Self> {
        let mut schema_builder = Schema::builder();

        // STRING for exact match ID (stored for retrieval)
        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        // TEXT for full-text search on content
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);
        let source_field = schema_builder.add_text_field("source", STRING | STORED);

        let schema = schema_builder.build();
        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| ZhimiError::index_with_source("Failed to create index writer", e))?;

        for chunk in chunks {
            let mut doc = TantivyDocument::default();
            doc.add_text(id_field, &chunk.id);
            doc.add_text(content_field, &chunk.content);
            if let Some(source) = &chunk.source {
                doc.add_text(source_field, source);
            }
            writer.add_document(doc)?;
        }
        writer.commit()?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| ZhimiError::index_with_source("Failed to create index reader", e))?;
        reader.reload()?;

        debug!(chunks = chunks.len(), "Built BM25 ranker");

        Ok(Self {
            index,
            reader,
            id_field,
            content_field,
            source_field,
        })
    }

    /// Search chunk content, best BM25 score first.
    ///
    /// Query syntax errors are tolerated: whatever parses is searched.
    pub fn search(&self, query: &str, limit: usize) -> ZhimiResult<Vec<TextSearchResult>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(vec![]);
        }

        let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(?errors, "Lenient query parse dropped clauses");
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(parsed.as_ref(), &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let text = |field: Field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            let (Some(id), Some(content)) = (text(self.id_field), text(self.content_field)) else {
                continue;
            };
            results.push(TextSearchResult {
                chunk: Chunk {
                    id,
                    content,
                    source: text(self.source_field),
                    metadata: Default::default(),
                },
                bm25_score: score,
            });
        }

        Ok(results)
    }

    /// Get the number of indexed documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl LexicalRanker for TantivyRanker {
    fn top_k(&self, query: &str, k: usize) -> ZhimiResult<Vec<Chunk>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .map(|r| r.chunk)
            .collect())
    }
}
