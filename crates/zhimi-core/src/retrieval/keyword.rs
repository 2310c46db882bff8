//! Substring keyword scoring used by `simple_keyword_search`.

use super::dedup::dedup_preserving_order;
use crate::types::Chunk;

/// Split a query into lowercase search terms.
///
/// Whitespace-separated tokens shorter than two characters are dropped and
/// repeats collapse to one. When nothing survives, the whole lowercased query
/// is the only term.
pub fn keyword_terms(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let terms = dedup_preserving_order(
        lowered
            .split_whitespace()
            .filter(|t| t.chars().count() > 1)
            .map(str::to_string),
    );

    if terms.is_empty() {
        vec![lowered]
    } else {
        terms
    }
}

/// Number of distinct terms occurring in `content`, case-insensitively.
pub fn match_count(content: &str, terms: &[String]) -> usize {
    let lowered = content.to_lowercase();
    terms.iter().filter(|t| lowered.contains(t.as_str())).count()
}

/// Rank chunks by keyword match count and keep the best `limit`.
///
/// Chunks with no match are excluded. Ties keep index order.
pub fn rank_by_keywords<'a>(chunks: &'a [Chunk], query: &str, limit: usize) -> Vec<&'a Chunk> {
    let terms = keyword_terms(query);

    let mut scored: Vec<(usize, &Chunk)> = chunks
        .iter()
        .map(|c| (match_count(&c.content, &terms), c))
        .filter(|(score, _)| *score > 0)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().map(|t| Chunk::new(*t)).collect()
    }

    #[test]
    fn test_terms_drop_short_and_repeated_tokens() {
        assert_eq!(keyword_terms("Rust a rust TOKIO"), vec!["rust", "tokio"]);
    }

    #[test]
    fn test_terms_fall_back_to_whole_query() {
        assert_eq!(keyword_terms("A"), vec!["a"]);
        assert_eq!(keyword_terms("x y"), vec!["x y"]);
        // One CJK character is a single char even though it is three bytes.
        assert_eq!(keyword_terms("装"), vec!["装"]);
    }

    #[test]
    fn test_cjk_query_without_spaces_is_one_term() {
        assert_eq!(keyword_terms("安装"), vec!["安装"]);
    }

    #[test]
    fn test_match_count_is_case_insensitive() {
        let terms = keyword_terms("rust tokio");
        assert_eq!(match_count("Rust with Tokio", &terms), 2);
        assert_eq!(match_count("RUST only", &terms), 1);
        assert_eq!(match_count("nothing", &terms), 0);
    }

    #[test]
    fn test_rank_orders_by_count_then_index() {
        let corpus = chunks(&["rust", "tokio and rust", "python", "rust again"]);
        let ranked = rank_by_keywords(&corpus, "rust tokio", 3);

        let contents: Vec<&str> = ranked.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["tokio and rust", "rust", "rust again"]);
    }

    #[test]
    fn test_rank_caps_results() {
        let corpus = chunks(&["go 1", "go 2", "go 3", "go 4", "go 5"]);
        assert_eq!(rank_by_keywords(&corpus, "go", 3).len(), 3);
    }

    #[test]
    fn test_rank_excludes_zero_scores() {
        let corpus = chunks(&["知觅是一个智能助手", "安装步骤：pip install"]);
        let ranked = rank_by_keywords(&corpus, "安装", 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].content, "安装步骤：pip install");
    }
}
