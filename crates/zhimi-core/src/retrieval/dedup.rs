//! Order-preserving de-duplication.
//!
//! Hybrid retrieval de-duplicates chunk contents by exact text, and the memory
//! merge unions preference lists; both keep the first occurrence of every item
//! and drop later repeats.

use std::collections::HashSet;
use std::hash::Hash;

/// Keep the first occurrence of every key, preserving input order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Keep the first occurrence of every string, preserving input order.
pub fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    dedup_by_key(items, |s| s.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let merged = dedup_preserving_order(strings(&["Go", "Rust", "Python", "Go"]));
        assert_eq!(merged, strings(&["Go", "Rust", "Python"]));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(dedup_preserving_order(Vec::new()).is_empty());
        assert_eq!(dedup_preserving_order(strings(&["x"])), strings(&["x"]));
    }

    #[test]
    fn test_by_key_uses_projection() {
        let pairs = vec![("a", 1), ("b", 2), ("a", 3)];
        let kept = dedup_by_key(pairs, |(name, _)| *name);
        assert_eq!(kept, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_exact_match_only() {
        // Case and whitespace differences are distinct items.
        let kept = dedup_preserving_order(strings(&["go", "Go", "Go "]));
        assert_eq!(kept.len(), 3);
    }
}
