//! Retrieval engine answering the orchestrator's two search tools.
//!
//! The engine holds the document index and the lexical ranker built at
//! startup. Both entry points return display text and never fail: missing
//! state or backend errors degrade to the fixed advisory strings.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::ZhimiResult;
use crate::traits::{DocumentIndex, LexicalRanker};
use crate::types::Chunk;

use super::config::{RetrievalConfig, INDEX_NOT_BUILT, NO_KEYWORD_MATCH, NO_LOCAL_INFO};
use super::dedup::dedup_preserving_order;
use super::keyword::rank_by_keywords;
use super::tantivy_search::TantivyRanker;

/// Keyword and hybrid search over the local document index.
#[derive(Clone)]
pub struct RetrievalEngine {
    index: Option<Arc<dyn DocumentIndex>>,
    ranker: Option<Arc<dyn LexicalRanker>>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Create an engine with no index attached.
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            index: None,
            ranker: None,
            config,
        }
    }

    /// Attach the document index.
    pub fn with_index(mut self, index: Arc<dyn DocumentIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Attach the lexical ranker.
    pub fn with_ranker(mut self, ranker: Arc<dyn LexicalRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Attach `index` and build a BM25 ranker over its full chunk collection.
    pub async fn from_index(
        index: Arc<dyn DocumentIndex>,
        config: RetrievalConfig,
    ) -> ZhimiResult<Self> {
        let chunks = index.chunks().await?;
        let ranker = TantivyRanker::build(&chunks)?;
        debug!(chunks = chunks.len(), "Retrieval engine ready");

        Ok(Self::new(config)
            .with_index(index)
            .with_ranker(Arc::new(ranker)))
    }

    /// Whether both the index and the ranker are present.
    pub fn is_ready(&self) -> bool {
        self.index.is_some() && self.ranker.is_some()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Return up to `keyword_top_k` chunks containing the most query terms.
    #[instrument(skip(self))]
    pub async fn simple_keyword_search(&self, query: &str) -> String {
        let Some(index) = &self.index else {
            return INDEX_NOT_BUILT.to_string();
        };

        let chunks = match index.chunks().await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Failed to load chunks for keyword search");
                return NO_LOCAL_INFO.to_string();
            }
        };
        if chunks.is_empty() {
            return NO_LOCAL_INFO.to_string();
        }

        let ranked = rank_by_keywords(&chunks, query, self.config.keyword_top_k);
        debug!(matches = ranked.len(), "Keyword search finished");

        if ranked.is_empty() {
            return NO_KEYWORD_MATCH.to_string();
        }
        self.render(ranked.into_iter().map(|c| c.content.clone()))
    }

    /// Semantic hits followed by lexical hits, de-duplicated by content.
    ///
    /// Results are not re-ranked; every semantic hit precedes every lexical
    /// one.
    #[instrument(skip(self))]
    pub async fn hybrid_search(&self, query: &str) -> String {
        let (Some(index), Some(ranker)) = (&self.index, &self.ranker) else {
            return INDEX_NOT_BUILT.to_string();
        };

        let semantic: Vec<Chunk> = match index.similarity_search(query, self.config.semantic_k).await
        {
            Ok(hits) => hits.into_iter().map(|h| h.chunk).collect(),
            Err(e) => {
                warn!(error = %e, "Semantic search failed, continuing without it");
                Vec::new()
            }
        };

        let lexical = match ranker.top_k(query, self.config.lexical_k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Lexical ranking failed, continuing without it");
                Vec::new()
            }
        };

        debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            "Hybrid search finished"
        );

        let contents = dedup_preserving_order(
            semantic
                .into_iter()
                .chain(lexical)
                .map(|c| c.content),
        );
        if contents.is_empty() {
            return NO_LOCAL_INFO.to_string();
        }
        self.render(contents)
    }

    fn render(&self, contents: impl IntoIterator<Item = String>) -> String {
        contents
            .into_iter()
            .collect::<Vec<_>>()
            .join(&self.config.delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZhimiError;
    use crate::types::ScoredChunk;
    use async_trait::async_trait;

    // Mock implementations for testing
    struct MockIndex {
        chunks: Vec<Chunk>,
        semantic: Vec<Chunk>,
        fail_search: bool,
    }

    impl MockIndex {
        fn with_chunks(texts: &[&str]) -> Self {
            Self {
                chunks: texts.iter().map(|t| Chunk::new(*t)).collect(),
                semantic: Vec::new(),
                fail_search: false,
            }
        }
    }

    #[async_trait]
    impl DocumentIndex for MockIndex {
        async fn chunks(&self) -> ZhimiResult<Vec<Chunk>> {
            Ok(self.chunks.clone())
        }

        async fn similarity_search(&self, _: &str, k: usize) -> ZhimiResult<Vec<ScoredChunk>> {
            if self.fail_search {
                return Err(ZhimiError::embedding("embedding service down"));
            }
            Ok(self
                .semantic
                .iter()
                .take(k)
                .map(|c| ScoredChunk {
                    chunk: c.clone(),
                    score: 0.9,
                })
                .collect())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl DocumentIndex for BrokenIndex {
        async fn chunks(&self) -> ZhimiResult<Vec<Chunk>> {
            Err(ZhimiError::database("no such table: chunks"))
        }

        async fn similarity_search(&self, _: &str, _: usize) -> ZhimiResult<Vec<ScoredChunk>> {
            Err(ZhimiError::database("no such table: chunks"))
        }
    }

    struct MockRanker {
        hits: Vec<Chunk>,
        fail: bool,
    }

    impl LexicalRanker for MockRanker {
        fn top_k(&self, _: &str, k: usize) -> ZhimiResult<Vec<Chunk>> {
            if self.fail {
                return Err(ZhimiError::index("ranker unavailable"));
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    fn engine(index: MockIndex, ranker: MockRanker) -> RetrievalEngine {
        RetrievalEngine::new(RetrievalConfig::default())
            .with_index(Arc::new(index))
            .with_ranker(Arc::new(ranker))
    }

    #[tokio::test]
    async fn test_unbuilt_index_returns_advisory() {
        let engine = RetrievalEngine::new(RetrievalConfig::default());
        assert!(!engine.is_ready());
        assert_eq!(engine.simple_keyword_search("安装").await, INDEX_NOT_BUILT);
        assert_eq!(engine.hybrid_search("安装").await, INDEX_NOT_BUILT);
    }

    #[tokio::test]
    async fn test_hybrid_requires_ranker() {
        let engine = RetrievalEngine::new(RetrievalConfig::default())
            .with_index(Arc::new(MockIndex::with_chunks(&["a chunk"])));
        assert_eq!(engine.hybrid_search("chunk").await, INDEX_NOT_BUILT);
        assert_eq!(engine.simple_keyword_search("chunk").await, "a chunk");
    }

    #[tokio::test]
    async fn test_keyword_search_single_match() {
        let engine = engine(
            MockIndex::with_chunks(&["知觅是一个智能助手", "安装步骤：pip install"]),
            MockRanker { hits: vec![], fail: false },
        );
        assert_eq!(
            engine.simple_keyword_search("安装").await,
            "安装步骤：pip install"
        );
    }

    #[tokio::test]
    async fn test_keyword_search_orders_and_caps() {
        let engine = engine(
            MockIndex::with_chunks(&[
                "rust",
                "rust and tokio",
                "rust",
                "tokio rust serde",
                "python",
            ]),
            MockRanker { hits: vec![], fail: false },
        );

        let result = engine.simple_keyword_search("rust tokio serde").await;
        let parts: Vec<&str> = result.split("\n\n---\n\n").collect();
        assert_eq!(parts, vec!["tokio rust serde", "rust and tokio", "rust"]);
    }

    #[tokio::test]
    async fn test_keyword_search_no_match_and_empty_index() {
        let e = engine(
            MockIndex::with_chunks(&["知觅是一个智能助手"]),
            MockRanker { hits: vec![], fail: false },
        );
        assert_eq!(e.simple_keyword_search("haskell").await, NO_KEYWORD_MATCH);

        let e = engine(
            MockIndex::with_chunks(&[]),
            MockRanker { hits: vec![], fail: false },
        );
        assert_eq!(e.simple_keyword_search("haskell").await, NO_LOCAL_INFO);
    }

    #[tokio::test]
    async fn test_keyword_search_backend_error_degrades() {
        let engine = RetrievalEngine::new(RetrievalConfig::default()).with_index(Arc::new(BrokenIndex));
        assert_eq!(engine.simple_keyword_search("x").await, NO_LOCAL_INFO);
    }

    #[tokio::test]
    async fn test_hybrid_semantic_first_and_deduplicated() {
        let x = Chunk::new("X");
        let y = Chunk::new("Y");
        let mut index = MockIndex::with_chunks(&["X", "Y"]);
        index.semantic = vec![x.clone()];

        let engine = engine(index, MockRanker { hits: vec![x, y], fail: false });
        assert_eq!(engine.hybrid_search("q").await, "X\n\n---\n\nY");
    }

    #[tokio::test]
    async fn test_hybrid_respects_per_source_limits() {
        let mut index = MockIndex::with_chunks(&[]);
        index.semantic = vec![Chunk::new("s1"), Chunk::new("s2"), Chunk::new("s3")];
        let ranker = MockRanker {
            hits: vec![Chunk::new("l1"), Chunk::new("l2"), Chunk::new("l3")],
            fail: false,
        };

        let result = engine(index, ranker).hybrid_search("q").await;
        assert_eq!(result, "s1\n\n---\n\ns2\n\n---\n\nl1\n\n---\n\nl2");
    }

    #[tokio::test]
    async fn test_hybrid_tolerates_one_failing_source() {
        let mut index = MockIndex::with_chunks(&[]);
        index.fail_search = true;
        let e = engine(index, MockRanker { hits: vec![Chunk::new("L")], fail: false });
        assert_eq!(e.hybrid_search("q").await, "L");

        let mut index = MockIndex::with_chunks(&[]);
        index.semantic = vec![Chunk::new("S")];
        let e = engine(index, MockRanker { hits: vec![], fail: true });
        assert_eq!(e.hybrid_search("q").await, "S");
    }

    #[tokio::test]
    async fn test_hybrid_nothing_found() {
        let mut index = MockIndex::with_chunks(&[]);
        index.fail_search = true;
        let e = engine(index, MockRanker { hits: vec![], fail: true });
        assert_eq!(e.hybrid_search("q").await, NO_LOCAL_INFO);
    }

    #[tokio::test]
    async fn test_from_index_builds_ranker() {
        let index = Arc::new(MockIndex::with_chunks(&["cargo build", "pip install"]));
        let engine = RetrievalEngine::from_index(index, RetrievalConfig::default())
            .await
            .unwrap();

        assert!(engine.is_ready());
        assert_eq!(engine.hybrid_search("pip").await, "pip install");
    }
}
