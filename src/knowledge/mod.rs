//! Knowledge pack: the declarative configuration driving classification.
//!
//! A pack carries the domain taxonomy, alias vocabulary, negative/gate
//! rules, scoring weights, variant-extraction patterns and fast-path
//! data. Packs are validated eagerly; a partially-shaped pack is never
//! accepted silently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod compiler;
pub mod patterns;
pub mod schema;

pub use compiler::{pack_signature, CompiledPack, GateTables, IncludeTerm, ThresholdTable};
pub use patterns::{compile_patterns, PatternSpec, VariantPattern};
pub use schema::load_pack;

use crate::types::{EngineError, EngineResult};

// ==================== PACK SECTIONS ====================

/// Category → domain keywords. Required section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub categories: BTreeMap<String, Vec<String>>,
}

/// One canonical vocabulary term with its spelling variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub canonical: String,
    #[serde(default)]
    pub variants: Vec<String>,
    /// Tag names looked up in `WeightConfig::tag_weights`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Strong domain terms earn the per-term strong bonus when matched.
    #[serde(default)]
    pub strong: bool,
    #[serde(default)]
    pub category: Option<String>,
}

/// Conditional include: `trigger` is normally a blocker, but is allowed
/// when any of `requires_any` co-occurs and none of `blocked_by` does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalInclude {
    pub trigger: String,
    #[serde(default)]
    pub requires_any: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
}

/// Negative vocabulary: gates, demotions and diagnostic noise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeRules {
    /// Terms whose presence hard-blocks an item.
    #[serde(default)]
    pub hard_blockers: Vec<String>,
    /// Regex blockers, compiled once at load time.
    #[serde(default)]
    pub blocker_patterns: Vec<PatternSpec>,
    /// Terms that demote without blocking.
    #[serde(default)]
    pub soft_demotions: Vec<String>,
    /// Lab/diagnostic noise terms; each occurrence costs a fixed penalty.
    #[serde(default)]
    pub diagnostic_terms: Vec<String>,
    #[serde(default)]
    pub conditional_includes: Vec<ConditionalInclude>,
}

/// Per-field match weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWeights {
    pub name: f32,
    pub brand: f32,
    pub model: f32,
    pub description: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name: 1.0,
            brand: 0.6,
            model: 0.6,
            description: 0.4,
        }
    }
}

/// Fast-path cascade tuning. The aggressive confidence scale is an
/// empirically tuned default carried as configuration, not a derived
/// constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastPathConfig {
    #[serde(default = "default_confidence_scale")]
    pub confidence_scale: f32,
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f32,
    #[serde(default = "default_token_index_top_k")]
    pub token_index_top_k: usize,
    #[serde(default = "default_trie_top_k")]
    pub trie_top_k: usize,
    /// Multiplier applied to trie-derived scores (fuzzy evidence is
    /// weaker than exact token evidence).
    #[serde(default = "default_trie_penalty")]
    pub trie_penalty: f32,
    #[serde(default = "default_bloom_false_positive_rate")]
    pub bloom_false_positive_rate: f64,
}

impl Default for FastPathConfig {
    fn default() -> Self {
        Self {
            confidence_scale: default_confidence_scale(),
            high_confidence_threshold: default_high_confidence_threshold(),
            token_index_top_k: default_token_index_top_k(),
            trie_top_k: default_trie_top_k(),
            trie_penalty: default_trie_penalty(),
            bloom_false_positive_rate: default_bloom_false_positive_rate(),
        }
    }
}

/// Scoring weights, bonuses, penalties and decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightConfig {
    #[serde(default = "default_base_score")]
    pub base_score: f32,
    #[serde(default = "default_accept_min_score")]
    pub accept_min_score: f32,
    #[serde(default = "default_review_lower_bound")]
    pub review_lower_bound: f32,
    /// Per-category accept thresholds overriding `accept_min_score`.
    #[serde(default)]
    pub category_thresholds: BTreeMap<String, f32>,
    #[serde(default)]
    pub field_weights: FieldWeights,
    /// Weight per alias tag; an alias takes the highest weight among its
    /// tags, falling back to `default_include_weight`.
    #[serde(default)]
    pub tag_weights: BTreeMap<String, f32>,
    #[serde(default = "default_include_weight")]
    pub default_include_weight: f32,
    #[serde(default = "default_exact_bonus")]
    pub exact_bonus: f32,
    #[serde(default = "default_synonym_bonus")]
    pub synonym_bonus: f32,
    #[serde(default = "default_strong_term_bonus")]
    pub strong_term_bonus: f32,
    #[serde(default = "default_diagnostic_penalty")]
    pub diagnostic_penalty: f32,
    #[serde(default = "default_soft_ignore_penalty")]
    pub soft_ignore_penalty: f32,
    #[serde(default = "default_hard_block_penalty")]
    pub hard_block_penalty: f32,
    #[serde(default = "default_category_match_bonus")]
    pub category_match_bonus: f32,
    #[serde(default)]
    pub fast_path: FastPathConfig,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            accept_min_score: default_accept_min_score(),
            review_lower_bound: default_review_lower_bound(),
            category_thresholds: BTreeMap::new(),
            field_weights: FieldWeights::default(),
            tag_weights: BTreeMap::new(),
            default_include_weight: default_include_weight(),
            exact_bonus: default_exact_bonus(),
            synonym_bonus: default_synonym_bonus(),
            strong_term_bonus: default_strong_term_bonus(),
            diagnostic_penalty: default_diagnostic_penalty(),
            soft_ignore_penalty: default_soft_ignore_penalty(),
            hard_block_penalty: default_hard_block_penalty(),
            category_match_bonus: default_category_match_bonus(),
            fast_path: FastPathConfig::default(),
        }
    }
}

/// Signed relevance hint keyed by an external code prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCodeRule {
    pub score: f32,
    #[serde(default)]
    pub category: Option<String>,
}

/// Keyword co-occurrence boost: fires when every keyword is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBoost {
    pub keywords: Vec<String>,
    pub boost: f32,
}

// ==================== PACK ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePack {
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
    #[serde(default)]
    pub negatives: NegativeRules,
    pub weights: WeightConfig,
    /// Regexes extracting non-identity attributes (size, side, color) for
    /// variant grouping.
    #[serde(default)]
    pub variant_patterns: Vec<PatternSpec>,
    /// External code prefix → relevance hint, fast path only.
    #[serde(default)]
    pub domain_codes: BTreeMap<String, DomainCodeRule>,
    /// Brand name → reputation boost, fast path only.
    #[serde(default)]
    pub brands: BTreeMap<String, f32>,
    #[serde(default)]
    pub context_boosts: Vec<ContextBoost>,
    /// Extra stop words merged into the built-in bilingual lists.
    #[serde(default)]
    pub stop_words: Vec<String>,
}

impl KnowledgePack {
    /// Eager validation of threshold and rule shape. Called at load and
    /// again at compile so a hand-built pack cannot bypass it.
    pub fn validate(&self) -> EngineResult<()> {
        let weights = &self.weights;

        for (label, value) in [
            ("baseScore", weights.base_score),
            ("acceptMinScore", weights.accept_min_score),
            ("reviewLowerBound", weights.review_lower_bound),
            (
                "fastPath.highConfidenceThreshold",
                weights.fast_path.high_confidence_threshold,
            ),
        ] {
            if !(0.0..=100.0).contains(&value) || !value.is_finite() {
                return Err(EngineError::InvalidPack(format!(
                    "{label} must be within [0, 100], got {value}"
                )));
            }
        }

        if weights.review_lower_bound > weights.accept_min_score {
            return Err(EngineError::InvalidPack(format!(
                "reviewLowerBound ({}) exceeds acceptMinScore ({})",
                weights.review_lower_bound, weights.accept_min_score
            )));
        }

        for (category, threshold) in &weights.category_thresholds {
            if !(0.0..=100.0).contains(threshold) || !threshold.is_finite() {
                return Err(EngineError::InvalidPack(format!(
                    "category threshold for {category:?} must be within [0, 100], got {threshold}"
                )));
            }
        }

        if weights.fast_path.confidence_scale <= 0.0 {
            return Err(EngineError::InvalidPack(format!(
                "fastPath.confidenceScale must be positive, got {}",
                weights.fast_path.confidence_scale
            )));
        }
        if !(0.0..=1.0).contains(&weights.fast_path.trie_penalty) {
            return Err(EngineError::InvalidPack(format!(
                "fastPath.triePenalty must be within [0, 1], got {}",
                weights.fast_path.trie_penalty
            )));
        }

        for alias in &self.aliases {
            if alias.canonical.trim().is_empty() {
                return Err(EngineError::InvalidPack(
                    "alias entry with empty canonical term".to_string(),
                ));
            }
        }

        for conditional in &self.negatives.conditional_includes {
            if conditional.trigger.trim().is_empty() {
                return Err(EngineError::InvalidPack(
                    "conditional include with empty trigger".to_string(),
                ));
            }
        }

        for boost in &self.context_boosts {
            if boost.keywords.is_empty() {
                return Err(EngineError::InvalidPack(
                    "context boost with no keywords".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// ==================== DEFAULTS ====================

fn default_base_score() -> f32 {
    40.0
}

fn default_accept_min_score() -> f32 {
    60.0
}

fn default_review_lower_bound() -> f32 {
    40.0
}

fn default_include_weight() -> f32 {
    10.0
}

fn default_exact_bonus() -> f32 {
    10.0
}

fn default_synonym_bonus() -> f32 {
    5.0
}

fn default_strong_term_bonus() -> f32 {
    15.0
}

fn default_diagnostic_penalty() -> f32 {
    8.0
}

fn default_soft_ignore_penalty() -> f32 {
    12.0
}

fn default_hard_block_penalty() -> f32 {
    100.0
}

fn default_category_match_bonus() -> f32 {
    8.0
}

fn default_confidence_scale() -> f32 {
    2.5
}

fn default_high_confidence_threshold() -> f32 {
    60.0
}

fn default_token_index_top_k() -> usize {
    5
}

fn default_trie_top_k() -> usize {
    5
}

fn default_trie_penalty() -> f32 {
    0.8
}

fn default_bloom_false_positive_rate() -> f64 {
    0.01
}

#[cfg(test)]
#[path = "tests/pack_tests.rs"]
mod tests;
