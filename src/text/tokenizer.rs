//! Stop-word-aware tokenization on top of the bilingual normalizer.

use std::collections::HashSet;

use crate::text::normalize;

/// English function words that carry no classification signal.
const ENGLISH_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "for", "with", "to", "in", "on", "at", "by",
    "from", "per",
];

/// Arabic function words, written in already-folded form.
const ARABIC_STOPWORDS: &[&str] = &[
    "من", "في", "الي", "علي", "عن", "مع", "او", "ذو", "ذات", "غير", "بدون", "كل",
];

/// Splits normalized text into signal-bearing tokens.
///
/// Keep rule: a token survives when it is not a stop word and is either
/// at least two characters long or purely numeric. Bare numbers are kept
/// on purpose: sizes, gauges and resistance levels are real signal in
/// equipment names.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
}

impl Tokenizer {
    /// Tokenizer with the built-in bilingual stop-word lists.
    pub fn new() -> Self {
        Self::with_stop_words(&[])
    }

    /// Tokenizer with built-in lists merged with pack-supplied extras.
    /// Every entry is normalized before insertion so callers can supply
    /// unfolded Arabic or mixed-case English.
    pub fn with_stop_words(extra: &[String]) -> Self {
        let mut stop_words = HashSet::new();
        for word in ENGLISH_STOPWORDS.iter().chain(ARABIC_STOPWORDS.iter()) {
            stop_words.insert(normalize(word));
        }
        for word in extra {
            let normalized = normalize(word);
            if !normalized.is_empty() {
                stop_words.insert(normalized);
            }
        }
        Self { stop_words }
    }

    /// Normalize and split text, applying the keep rule. Order preserved,
    /// duplicates retained.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        normalize(text)
            .split_whitespace()
            .filter(|token| self.should_keep(token))
            .map(str::to_string)
            .collect()
    }

    /// Deduplicated token set for membership probes.
    pub fn token_set(&self, text: &str) -> HashSet<String> {
        self.tokenize(text).into_iter().collect()
    }

    fn should_keep(&self, token: &str) -> bool {
        if self.stop_words.contains(token) {
            return false;
        }
        token.chars().count() >= 2 || token.chars().all(|ch| ch.is_ascii_digit())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/tokenizer_tests.rs"]
mod tests;
