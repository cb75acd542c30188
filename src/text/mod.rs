//! Bilingual text normalization for catalog entries.
//!
//! Canonicalizes Arabic and English free text into a single comparable
//! form and derives the order-independent fingerprint used as a
//! deduplication key.

use crate::types::{CatalogItem, NormalizedItem};

pub mod tokenizer;

pub use tokenizer::Tokenizer;

/// Fold one character into its canonical form.
///
/// Returns `None` for characters that are dropped entirely (harakat,
/// tatweel). Mapped and unmapped characters come back as `Some`.
fn fold_char(ch: char) -> Option<char> {
    match ch {
        // Tashkeel marks and the superscript alef carry no lexical identity.
        '\u{064B}'..='\u{065F}' | '\u{0670}' => None,
        // Tatweel is purely visual elongation.
        '\u{0640}' => None,
        // Hamza-seated alef forms (alef madda, alef hamza above/below) fold
        // to bare alef.
        '\u{0622}' | '\u{0623}' | '\u{0625}' => Some('\u{0627}'),
        // Teh marbuta folds to heh.
        '\u{0629}' => Some('\u{0647}'),
        // Alef maksura folds to yeh.
        '\u{0649}' => Some('\u{064A}'),
        // Hamza on waw / hamza on yeh fold to the bare carrier letter.
        '\u{0624}' => Some('\u{0648}'),
        '\u{0626}' => Some('\u{064A}'),
        // Arabic-Indic and Eastern Arabic-Indic digits map to ASCII digits.
        '\u{0660}'..='\u{0669}' => Some(char::from(b'0' + (ch as u32 - 0x0660) as u8)),
        '\u{06F0}'..='\u{06F9}' => Some(char::from(b'0' + (ch as u32 - 0x06F0) as u8)),
        _ => Some(ch),
    }
}

/// Normalize bilingual text into its canonical comparable form.
///
/// Pipeline:
/// 1. Strip Arabic diacritics and tatweel
/// 2. Fold hamza variants (أ/إ/آ→ا), teh marbuta (ة→ه), alef maksura (ى→ي),
///    hamza carriers (ؤ→و, ئ→ي)
/// 3. Convert Arabic-Indic digits to Western digits
/// 4. Lowercase
/// 5. Replace punctuation and symbols with spaces (letters of any script
///    and digits survive)
/// 6. Collapse whitespace
///
/// Deterministic and idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    // Steps 1-3: single folding pass.
    let mut folded = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(mapped) = fold_char(ch) {
            folded.push(mapped);
        }
    }

    // Steps 4-5: lowercase and strip symbols, keeping all-script letters.
    let mut cleaned = String::with_capacity(folded.len());
    for ch in folded.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                cleaned.push(lower);
            }
        } else {
            cleaned.push(' ');
        }
    }

    // Step 6: collapse whitespace.
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the word-order-independent deduplication key for a text.
///
/// Tokenizes the normalized text on whitespace, sorts the distinct tokens
/// lexicographically and rejoins them, so any permutation of the same
/// word set yields an identical key.
pub fn fingerprint(text: &str) -> String {
    let normalized = normalize(text);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}

/// Whether the text contains any character from the Arabic script blocks.
/// Used by dedupe tie-breaking when electing a group representative.
pub fn contains_arabic(text: &str) -> bool {
    text.chars()
        .any(|ch| matches!(ch, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}'))
}

/// Normalize every text field of a raw catalog item.
///
/// Missing optional fields become empty strings so downstream matching
/// never deals with `Option` text. Tokens cover the combined searchable
/// text (name, brand, model, description); the fingerprint covers the
/// name only.
pub fn normalize_item(item: &CatalogItem, tokenizer: &Tokenizer) -> NormalizedItem {
    let mut normalized = NormalizedItem {
        normalized_name: normalize(&item.name),
        normalized_brand: normalize(item.brand.as_deref().unwrap_or("")),
        normalized_model: normalize(item.model.as_deref().unwrap_or("")),
        normalized_description: normalize(item.description.as_deref().unwrap_or("")),
        normalized_category: normalize(item.category.as_deref().unwrap_or("")),
        normalized_sku: normalize(item.sku.as_deref().unwrap_or("")),
        tokens: Vec::new(),
        fingerprint: fingerprint(&item.name),
        item: item.clone(),
    };
    normalized.tokens = tokenizer.tokenize(&normalized.combined_text());
    normalized
}

#[cfg(test)]
#[path = "tests/normalizer_tests.rs"]
mod tests;
