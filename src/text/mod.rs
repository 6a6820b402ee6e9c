//! The text/tokenizer collaborator (§4.5 TEXT stage, §6).
//!
//! Tokenization is grapheme-aware (via [`unicode_segmentation`]) rather than
//! byte- or codepoint-based, so multi-byte scripts split on the same visual
//! boundaries a human reader would use. Symbols in [`GROUP_SYMBOLS`] are kept
//! when they appear inside a token (`state-of-the-art`, `3.14`) but stripped
//! from the edges (`"hello,"` -> `hello`).

mod contractions;
mod stopwords;

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Symbols treated as part of a word when interior, not just separators.
const GROUP_SYMBOLS: &[char] = &['-', '.', '/', '_', '~'];

/// True if `token` is made entirely of digits and/or [`GROUP_SYMBOLS`] --
/// version numbers, bare numerals, etc. are not useful word-count signal.
fn is_non_term(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit() || GROUP_SYMBOLS.contains(&c))
}

fn trim_group_symbols(word: &str) -> &str {
    word.trim_matches(|c: char| GROUP_SYMBOLS.contains(&c))
}

/// Splits `text` into lowercase word tokens: Unicode word boundaries via
/// [`unicode_segmentation`], contraction expansion, symbol-edge trimming,
/// and numeric/symbol-only tokens dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in text.unicode_words() {
        let lower = raw.to_lowercase();
        if let Some(expansion) = contractions::expand(&lower) {
            tokens.extend(expansion.split(' ').map(|s| s.to_string()));
            continue;
        }
        let trimmed = trim_group_symbols(&lower);
        if trimmed.is_empty() || is_non_term(trimmed) {
            continue;
        }
        tokens.push(trimmed.to_string());
    }
    tokens
}

/// Tokenizes `text` then filters out stopwords, leaving content words only.
pub fn content_words(text: &str) -> Vec<String> {
    tokenize(text).into_iter().filter(|w| !stopwords::is_stopword(w)).collect()
}

/// Builds a token -> frequency map from already-tokenized words.
pub fn word_count(words: &[String]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for word in words {
        *counts.entry(word.clone()).or_insert(0) += 1;
    }
    counts
}

/// Returns the `n` most frequent words, ties broken alphabetically for a
/// deterministic report ordering.
pub fn common_words(counts: &HashMap<String, u32>, n: usize) -> Vec<(String, u32)> {
    let mut entries: Vec<(String, u32)> = counts.iter().map(|(w, c)| (w.clone(), *c)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_interior_symbols_and_trims_edges() {
        let tokens = tokenize("state-of-the-art, 3.14!");
        assert!(tokens.contains(&"state-of-the-art".to_string()));
        assert!(!tokens.iter().any(|t| t == "3.14"));
    }

    #[test]
    fn expands_contractions_into_multiple_tokens() {
        let tokens = tokenize("don't stop");
        assert!(tokens.contains(&"do".to_string()));
        assert!(tokens.contains(&"not".to_string()));
        assert!(tokens.contains(&"stop".to_string()));
    }

    #[test]
    fn content_words_drops_stopwords() {
        let words = content_words("the quick fox jumps over the lazy dog");
        assert!(!words.contains(&"the".to_string()));
        assert!(words.contains(&"quick".to_string()));
    }

    #[test]
    fn common_words_orders_by_count_then_alphabetically() {
        let mut counts = HashMap::new();
        counts.insert("b".to_string(), 2);
        counts.insert("a".to_string(), 2);
        counts.insert("c".to_string(), 5);
        let top = common_words(&counts, 2);
        assert_eq!(top, vec![("c".to_string(), 5), ("a".to_string(), 2)]);
    }
}
