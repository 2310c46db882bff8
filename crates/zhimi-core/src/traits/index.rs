//! Document index and lexical ranker seams used by the retrieval engine.

use async_trait::async_trait;

use crate::error::ZhimiResult;
use crate::types::{Chunk, ScoredChunk};

/// A persisted collection of embedded chunks supporting nearest-neighbour
/// queries.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Every chunk in the index, in index order.
    async fn chunks(&self) -> ZhimiResult<Vec<Chunk>>;

    /// Embed `query` and return the `k` closest chunks, most similar first.
    async fn similarity_search(&self, query: &str, k: usize) -> ZhimiResult<Vec<ScoredChunk>>;
}

/// Term-frequency based ranking over the same chunk collection.
pub trait LexicalRanker: Send + Sync {
    /// Return up to `k` chunks ranked by query-term overlap, best first.
    fn top_k(&self, query: &str, k: usize) -> ZhimiResult<Vec<Chunk>>;
}
