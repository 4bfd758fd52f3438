//! Text tokenization shared by indexing and query normalization.
//!
//! Both sides must tokenize identically or relevance scores drift, so the
//! index and the query planner call the same functions.

/// Split text into lowercase terms.
///
/// Terms are maximal runs of alphanumeric characters or `_`, so
/// identifiers such as `parse_args` survive as a single term.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a free-text keyword into a canonical term list.
///
/// Terms are sorted and de-duplicated, so keywords that differ only in
/// case, word order, punctuation or repetition produce the same list.
pub fn normalize_keyword(keyword: &str) -> Vec<String> {
    let mut terms = tokenize(keyword);
    terms.sort();
    terms.dedup();
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        let terms = tokenize("Hello, World! fn parse_args()");
        assert_eq!(terms, vec!["hello", "world", "fn", "parse_args"]);
    }

    #[test]
    fn test_tokenize_empty_and_punctuation() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... !!").is_empty());
    }

    #[test]
    fn test_normalize_keyword_is_order_insensitive() {
        assert_eq!(
            normalize_keyword("Sort QUICK quick"),
            normalize_keyword("quick sort")
        );
        assert_eq!(normalize_keyword("quick sort"), vec!["quick", "sort"]);
    }
}
