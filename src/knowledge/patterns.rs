//! Validated pattern specifications and their compiled form.
//!
//! Patterns arrive in the pack as labeled regex strings and are compiled
//! exactly once at load time. An invalid pattern is logged and skipped;
//! the rest of the set still compiles and classification proceeds
//! without it.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Declarative pattern as it appears in the pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSpec {
    /// Attribute label, e.g. `size`, `side`, `color`, `resistance`.
    pub label: String,
    pub pattern: String,
}

/// Compiled variant-extraction pattern.
#[derive(Debug, Clone)]
pub struct VariantPattern {
    pub label: String,
    pub regex: Regex,
}

impl VariantPattern {
    /// Extract the attribute as a `label:value` token. The value is the
    /// first capture group when present, the whole match otherwise.
    pub fn extract(&self, text: &str) -> Option<String> {
        let captures = self.regex.captures(text)?;
        let value = captures.get(1).or_else(|| captures.get(0))?.as_str().trim();
        if value.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.label, value))
    }

    /// Remove every occurrence of the pattern, leaving a space so token
    /// boundaries survive.
    pub fn strip(&self, text: &str) -> String {
        self.regex.replace_all(text, " ").to_string()
    }

    /// Whole-text presence check, used by regex blockers.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Compile a pattern set, logging and skipping invalid entries.
pub fn compile_patterns(specs: &[PatternSpec]) -> Vec<VariantPattern> {
    let mut compiled = Vec::with_capacity(specs.len());
    for spec in specs {
        match Regex::new(&spec.pattern) {
            Ok(regex) => compiled.push(VariantPattern {
                label: spec.label.clone(),
                regex,
            }),
            Err(err) => {
                log::warn!(
                    "Skipping invalid pattern {:?} ({:?}): {err}",
                    spec.label,
                    spec.pattern
                );
            }
        }
    }
    compiled
}

#[cfg(test)]
#[path = "tests/patterns_tests.rs"]
mod tests;
