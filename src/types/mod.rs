//! Core data model for the classification and deduplication engine.
//!
//! Contains the item lifecycle chain (CatalogItem → NormalizedItem →
//! ScoredItem → ProcessedItem), the dedupe output contract
//! (GroupedRecord), and the audit payloads shared by both classifier
//! strategies (ScoreBreakdown, TermHit, GateBlock, Explanation).

use serde::{Deserialize, Serialize};

pub mod errors;

pub use errors::{EngineError, EngineResult};

// ==================== INPUT TYPES ====================

/// Raw catalog entry as supplied by the ingestion collaborator.
///
/// Immutable once ingested. Every optional text field is treated as an
/// empty string during normalization so classification never fails for
/// a well-typed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// External classification code (e.g. a procurement nomenclature code).
    /// Consumed only by the fast-path cascade's domain-code stage.
    #[serde(default)]
    pub domain_code: Option<String>,
}

impl CatalogItem {
    /// Minimal constructor; all optional fields start empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brand: None,
            model: None,
            category: None,
            description: None,
            sku: None,
            region: None,
            item_type: None,
            manufacturer: None,
            supplier: None,
            country: None,
            price: None,
            domain_code: None,
        }
    }
}

/// CatalogItem plus the canonical text forms every downstream component
/// consumes. `fingerprint` is word-order independent: any permutation of
/// the same name tokens yields the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub item: CatalogItem,
    pub normalized_name: String,
    pub normalized_brand: String,
    pub normalized_model: String,
    pub normalized_description: String,
    pub normalized_category: String,
    pub normalized_sku: String,
    /// Stop-word-filtered tokens of the combined searchable text
    /// (name + brand + model + description).
    pub tokens: Vec<String>,
    /// Order-independent key of the normalized name's sorted tokens.
    pub fingerprint: String,
}

impl NormalizedItem {
    /// Combined normalized text used by gate evaluation and the fast path.
    pub fn combined_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        for part in [
            self.normalized_name.as_str(),
            self.normalized_brand.as_str(),
            self.normalized_model.as_str(),
            self.normalized_description.as_str(),
        ] {
            if !part.is_empty() {
                parts.push(part);
            }
        }
        parts.join(" ")
    }
}

// ==================== AUDIT TYPES ====================

/// Which normalized field a term hit landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Name,
    Brand,
    Model,
    Description,
    /// Combined-text hits (gates, diagnostics, fast-path stages).
    Combined,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Name => write!(f, "name"),
            FieldKind::Brand => write!(f, "brand"),
            FieldKind::Model => write!(f, "model"),
            FieldKind::Description => write!(f, "description"),
            FieldKind::Combined => write!(f, "combined"),
        }
    }
}

/// Which single-term matching strategy produced a hit.
///
/// The hybrid matcher tries these in fixed priority order; the first
/// success wins and no strategies are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Exact,
    Substring,
    Affix,
    Fuzzy,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Exact => write!(f, "exact"),
            MatchStrategy::Substring => write!(f, "substring"),
            MatchStrategy::Affix => write!(f, "affix"),
            MatchStrategy::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// One matched vocabulary term with its provenance and score contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermHit {
    /// The vocabulary term that matched (normalized form).
    pub term: String,
    /// Canonical form when the hit was a variant/synonym of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub field: FieldKind,
    pub strategy: MatchStrategy,
    pub confidence: f32,
    /// Signed score contribution (negative for ignore/diagnostic hits).
    pub contribution: f32,
}

/// Hard gate outcome. `reason` always names the blocking or triggering term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateBlock {
    pub term: String,
    pub reason: String,
}

/// Per-signal score components. The final score is the clamped sum of all
/// fields (the fast path additionally applies its configured confidence
/// scale before clamping; the applied scale is recorded in the notes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: f32,
    pub name_match: f32,
    pub brand_match: f32,
    pub model_match: f32,
    pub description_match: f32,
    pub category_match: f32,
    pub exact_bonus: f32,
    pub synonym_bonus: f32,
    pub strong_term_bonus: f32,
    pub diagnostic_penalty: f32,
    pub ignore_penalty: f32,
    pub gate_penalty: f32,
    // Fast-path cascade stages.
    pub domain_code: f32,
    pub token_index: f32,
    pub trie_fuzzy: f32,
    pub context_boost: f32,
    pub brand_boost: f32,
}

impl ScoreBreakdown {
    /// Unclamped, unscaled sum of every component.
    pub fn sum(&self) -> f32 {
        self.base
            + self.name_match
            + self.brand_match
            + self.model_match
            + self.description_match
            + self.category_match
            + self.exact_bonus
            + self.synonym_bonus
            + self.strong_term_bonus
            + self.diagnostic_penalty
            + self.ignore_penalty
            + self.gate_penalty
            + self.domain_code
            + self.token_index
            + self.trie_fuzzy
            + self.context_boost
            + self.brand_boost
    }
}

// ==================== RESULT TYPES ====================

/// NormalizedItem plus the full scoring audit. Invariant: `score` ∈ [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub item: NormalizedItem,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    pub matched_terms: Vec<TermHit>,
    pub negative_terms: Vec<TermHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by_gate: Option<GateBlock>,
    /// Fast-path high-confidence relevance flag; `None` for the standard scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant: Option<bool>,
    /// Short literal stage/signal fragments, in evaluation order.
    pub notes: Vec<String>,
}

/// Decision bucket derived purely from score and the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Accepted,
    Review,
    Rejected,
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionStatus::Accepted => write!(f, "accepted"),
            DecisionStatus::Review => write!(f, "review"),
            DecisionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Final decided record. `reason` always cites the numeric score and the
/// threshold it was compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedItem {
    pub scored: ScoredItem,
    pub status: DecisionStatus,
    /// Threshold the decision was made against (category override or global).
    pub threshold: f32,
    pub reason: String,
    /// Dedupe group this record represents, when produced by the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Number of catalog variants consolidated into this record (≥ 1).
    pub variant_count: usize,
}

impl ProcessedItem {
    pub fn id(&self) -> &str {
        &self.scored.item.item.id
    }

    pub fn name(&self) -> &str {
        &self.scored.item.item.name
    }

    pub fn score(&self) -> f32 {
        self.scored.score
    }

    pub fn category(&self) -> Option<&str> {
        self.scored.item.item.category.as_deref()
    }

    pub fn fingerprint(&self) -> &str {
        &self.scored.item.fingerprint
    }
}

/// Full audit projection for one processed item, assembled from stored
/// results only — producing it never re-runs scoring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub id: String,
    pub name: String,
    pub score: f32,
    pub status: DecisionStatus,
    pub threshold: f32,
    pub reason: String,
    pub fingerprint: String,
    pub breakdown: ScoreBreakdown,
    pub matched_terms: Vec<TermHit>,
    pub negative_terms: Vec<TermHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by_gate: Option<GateBlock>,
    pub notes: Vec<String>,
}

// ==================== DEDUPE TYPES ====================

/// One consolidated catalog variant inside a GroupedRecord.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub item_id: String,
    pub name: String,
    /// Extracted variant attributes, e.g. `size:large`, `side:left`. Sorted.
    pub variant_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Min/max of member prices within a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Dedupe output: one base identity with its consolidated variants.
///
/// Invariant: across all groups produced from one input batch, the
/// `member_ids` lengths sum to the batch's input count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedRecord {
    /// Stable identifier derived from the base key, not random.
    pub group_id: String,
    pub base_key: String,
    /// Most complete member, re-normalized with the merged description.
    pub base: NormalizedItem,
    /// One entry per consolidated member (base included).
    pub variants: Vec<VariantRecord>,
    /// Distinct SKUs across all members, sorted.
    pub skus: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    /// Every absorbed input item id, base and exact duplicates included.
    pub member_ids: Vec<String>,
}

impl GroupedRecord {
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}

// ==================== DETERMINISTIC ORDERING ====================

/// Sort processed items deterministically: score desc → name asc → id asc.
pub fn sort_processed_deterministic(items: &mut [ProcessedItem]) {
    items.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name().cmp(b.name()))
            .then_with(|| a.id().cmp(b.id()))
    });
}

// ==================== CAPS & LIMITS ====================

/// Maximum matched/negative term hits retained per item (prevents
/// unbounded growth on pathological inputs).
pub const MAX_TERM_HITS: usize = 32;

/// Maximum explanation note fragments retained per item.
pub const MAX_NOTES: usize = 16;

/// Truncate a hit list to [`MAX_TERM_HITS`], keeping evaluation order.
pub fn cap_term_hits(hits: &mut Vec<TermHit>) {
    if hits.len() > MAX_TERM_HITS {
        hits.truncate(MAX_TERM_HITS);
    }
}

/// Truncate a note list to [`MAX_NOTES`], keeping evaluation order.
pub fn cap_notes(notes: &mut Vec<String>) {
    if notes.len() > MAX_NOTES {
        notes.truncate(MAX_NOTES);
    }
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
