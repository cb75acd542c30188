//! Cascading single-term matcher used by the scoring pipeline.
//!
//! Strategies run in fixed priority order and the first success wins;
//! confidences are never combined or averaged. Both inputs are expected
//! in normalized form.

use std::collections::HashSet;

use crate::types::MatchStrategy;

/// Confidence assigned per strategy.
const CONFIDENCE_EXACT: f32 = 1.0;
const CONFIDENCE_SUBSTRING: f32 = 0.9;
const CONFIDENCE_AFFIX: f32 = 0.85;

/// Minimum stripped-term length for the affix strategy to apply.
const AFFIX_MIN_LEN: usize = 4;

/// Minimum trigram Jaccard similarity for a fuzzy match.
const FUZZY_MIN_SIMILARITY: f32 = 0.7;

/// Minimum corpus word length considered by the fuzzy strategy.
const FUZZY_MIN_WORD_LEN: usize = 3;

/// Successful match: which strategy fired, how confident, and the text
/// that actually matched (the corpus word for fuzzy hits).
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub strategy: MatchStrategy,
    pub confidence: f32,
    pub hit: String,
}

/// Try each strategy in priority order against normalized text.
///
/// 1. Exact word-boundary occurrence → 1.0
/// 2. Substring containment → 0.9 (compound words)
/// 3. Alphanumeric-affix containment, stripped term longer than 3 chars
///    → 0.85 (SKU/model numbers regardless of punctuation)
/// 4. Best trigram-Jaccard over corpus words, similarity ≥ 0.7 → fuzzy
///
/// No stage matching is a plain `None`, never a penalty.
pub fn match_term(term: &str, corpus: &str) -> Option<TermMatch> {
    if term.is_empty() || corpus.is_empty() {
        return None;
    }

    if has_word_boundary_match(term, corpus) {
        return Some(TermMatch {
            strategy: MatchStrategy::Exact,
            confidence: CONFIDENCE_EXACT,
            hit: term.to_string(),
        });
    }

    if corpus.contains(term) {
        return Some(TermMatch {
            strategy: MatchStrategy::Substring,
            confidence: CONFIDENCE_SUBSTRING,
            hit: term.to_string(),
        });
    }

    let stripped_term = strip_non_alphanumeric(term);
    if stripped_term.chars().count() >= AFFIX_MIN_LEN {
        let stripped_corpus = strip_non_alphanumeric(corpus);
        if stripped_corpus.contains(&stripped_term) {
            return Some(TermMatch {
                strategy: MatchStrategy::Affix,
                confidence: CONFIDENCE_AFFIX,
                hit: stripped_term,
            });
        }
    }

    best_trigram_match(term, corpus)
}

/// Whole-token presence check on normalized text. Used directly by gate
/// and negative-term evaluation, which deliberately never fuzzy-match.
pub fn contains_term(term: &str, corpus: &str) -> bool {
    if term.is_empty() || corpus.is_empty() {
        return false;
    }
    has_word_boundary_match(term, corpus)
}

/// Whole-token occurrence of `term` inside `corpus`.
fn has_word_boundary_match(term: &str, corpus: &str) -> bool {
    if corpus == term {
        return true;
    }
    corpus.starts_with(&format!("{term} "))
        || corpus.ends_with(&format!(" {term}"))
        || corpus.contains(&format!(" {term} "))
}

fn strip_non_alphanumeric(text: &str) -> String {
    text.chars().filter(|ch| ch.is_alphanumeric()).collect()
}

/// Character trigram set. Strings shorter than three characters produce
/// an empty set and therefore never match.
fn trigrams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// Best trigram-Jaccard similarity between the term and any corpus word
/// of at least [`FUZZY_MIN_WORD_LEN`] characters.
fn best_trigram_match(term: &str, corpus: &str) -> Option<TermMatch> {
    let term_trigrams = trigrams(term);
    if term_trigrams.is_empty() {
        return None;
    }

    let mut best: Option<(f32, &str)> = None;
    for word in corpus.split_whitespace() {
        if word.chars().count() < FUZZY_MIN_WORD_LEN {
            continue;
        }
        let similarity = jaccard(&term_trigrams, &trigrams(word));
        match best {
            Some((current, _)) if current >= similarity => {}
            _ => best = Some((similarity, word)),
        }
    }

    let (similarity, word) = best?;
    if similarity >= FUZZY_MIN_SIMILARITY {
        Some(TermMatch {
            strategy: MatchStrategy::Fuzzy,
            confidence: similarity,
            hit: word.to_string(),
        })
    } else {
        None
    }
}

#[cfg(test)]
#[path = "tests/matcher_tests.rs"]
mod tests;
