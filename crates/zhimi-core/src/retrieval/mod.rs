//! Retrieval over the local document index.
//!
//! Two strategies are offered to the orchestrator:
//! - Keyword: substring term matching, best match count first
//! - Hybrid: semantic nearest neighbours followed by BM25 hits

mod config;
mod dedup;
mod engine;
mod keyword;
mod tantivy_search;

pub use config::{
    RetrievalConfig, INDEX_NOT_BUILT, NO_KEYWORD_MATCH, NO_LOCAL_INFO, RESULT_DELIMITER,
};
pub use dedup::{dedup_by_key, dedup_preserving_order};
pub use engine::RetrievalEngine;
pub use keyword::{keyword_terms, match_count, rank_by_keywords};
pub use tantivy_search::{TantivyRanker, TextSearchResult};
