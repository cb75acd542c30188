//! Pipeline orchestration: normalize → dedupe → classify → decide.
//!
//! The engine owns one compiled pack behind an `Arc` and an explicit
//! classifier strategy injected at construction; there is no fallback
//! chain between strategies. Processing replaces the stored result set,
//! while querying, explanation and summaries are pure projections over
//! it and never re-run scoring. Hot reload compiles the incoming pack
//! fully aside and swaps the shared handle only once it is ready.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dedupe;
use crate::knowledge::{pack_signature, CompiledPack, KnowledgePack};
use crate::scoring::score_item;
use crate::text::{normalize, normalize_item};
use crate::types::{
    CatalogItem, DecisionStatus, EngineResult, Explanation, GroupedRecord, NormalizedItem,
    ProcessedItem, ScoredItem,
};

pub mod batch;
pub mod fast_path;

pub use batch::{
    run_batch, BatchOptions, BatchPhase, BatchProgress, BatchReport, BatchRun, BatchStatus,
    ItemFailure,
};
pub use fast_path::classify_fast;

// ==================== STRATEGY & QUERY TYPES ====================

/// Which classifier the engine runs. Chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierStrategy {
    /// Full weighted scorer with per-field matching.
    Standard,
    /// Retrieval cascade tuned for very large batches.
    FastPath,
}

/// Sort key for [`Engine::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Score,
    Name,
    Category,
}

/// Filter/sort predicates over the processed set. All filters are
/// conjunctive; an empty query returns everything in stored order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultQuery {
    pub status: Option<DecisionStatus>,
    /// Matched against the item's normalized category, so any casing or
    /// diacritic variant of the same category name is equivalent.
    pub category: Option<String>,
    pub min_score: Option<f32>,
    pub sort: Option<SortKey>,
    pub ascending: bool,
}

impl ResultQuery {
    fn matches(&self, record: &ProcessedItem) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if normalize(category) != record.scored.item.normalized_category {
                return false;
            }
        }
        if let Some(min_score) = self.min_score {
            if record.score() < min_score {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts over the processed set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSummary {
    pub total: usize,
    pub accepted: usize,
    pub review: usize,
    pub rejected: usize,
    /// Record counts keyed by normalized category; records without a
    /// category land under `uncategorized`.
    pub per_category: BTreeMap<String, usize>,
}

/// Key used in [`EngineSummary::per_category`] for records with no category.
const UNCATEGORIZED_KEY: &str = "uncategorized";

// ==================== ENGINE ====================

/// Classification engine: one compiled pack, one strategy, and the
/// result set of the most recent [`Engine::process`] call.
#[derive(Debug, Clone)]
pub struct Engine {
    compiled: Arc<CompiledPack>,
    strategy: ClassifierStrategy,
    processed: Vec<ProcessedItem>,
    groups: Vec<GroupedRecord>,
    /// Every member id (absorbed duplicates included) → processed index.
    index_by_id: BTreeMap<String, usize>,
}

impl Engine {
    /// Validate and compile the pack, then build an engine around it.
    pub fn new(pack: KnowledgePack, strategy: ClassifierStrategy) -> EngineResult<Self> {
        Ok(Self::with_compiled(
            Arc::new(CompiledPack::compile(pack)?),
            strategy,
        ))
    }

    /// Engine sharing an already-compiled pack.
    pub fn with_compiled(compiled: Arc<CompiledPack>, strategy: ClassifierStrategy) -> Self {
        Self {
            compiled,
            strategy,
            processed: Vec::new(),
            groups: Vec::new(),
            index_by_id: BTreeMap::new(),
        }
    }

    pub fn compiled(&self) -> &Arc<CompiledPack> {
        &self.compiled
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    /// Content signature of the currently loaded pack.
    pub fn signature(&self) -> &str {
        &self.compiled.signature
    }

    /// Results of the most recent [`Engine::process`] call, in group order.
    pub fn results(&self) -> &[ProcessedItem] {
        &self.processed
    }

    /// Dedupe groups backing the current result set, in group order.
    pub fn groups(&self) -> &[GroupedRecord] {
        &self.groups
    }

    // ─── Processing ────────────────────────────────────────────────────

    /// Classify one already-normalized item with the configured strategy.
    pub fn classify(&self, item: &NormalizedItem) -> EngineResult<ScoredItem> {
        classify_with(&self.compiled, self.strategy, item)
    }

    /// Full pipeline over one input batch. Replaces the stored result
    /// set: normalize every item, consolidate duplicates and variants,
    /// classify each group's base record, assign a decision status.
    pub fn process(&mut self, items: &[CatalogItem]) -> EngineResult<&[ProcessedItem]> {
        let normalized: Vec<NormalizedItem> = items
            .iter()
            .map(|item| normalize_item(item, &self.compiled.tokenizer))
            .collect();
        let groups = dedupe::group_items(
            &normalized,
            &self.compiled.variant_patterns,
            &self.compiled.tokenizer,
        );
        log::debug!(
            "[PIPELINE] {} items consolidated into {} groups",
            items.len(),
            groups.len()
        );

        let mut processed: Vec<ProcessedItem> = Vec::with_capacity(groups.len());
        let mut index_by_id: BTreeMap<String, usize> = BTreeMap::new();
        for (index, group) in groups.iter().enumerate() {
            let scored = self.classify(&group.base)?;
            processed.push(decide(&self.compiled, scored, group));
            for member_id in &group.member_ids {
                index_by_id.insert(member_id.clone(), index);
            }
        }

        self.processed = processed;
        self.groups = groups;
        self.index_by_id = index_by_id;
        Ok(&self.processed)
    }

    /// Chunked, cancellable batch run over the same pipeline. Does not
    /// touch the engine's stored result set.
    pub fn run_batch<F>(
        &self,
        items: &[CatalogItem],
        options: &BatchOptions,
        on_progress: F,
    ) -> BatchRun
    where
        F: FnMut(BatchProgress),
    {
        batch::run_batch(&self.compiled, self.strategy, items, options, on_progress)
    }

    /// Swap in a new pack. Compilation happens fully aside; the handle is
    /// replaced only on success, so concurrent holders of the previous
    /// `Arc` finish on the old compiled set. A pack whose signature equals
    /// the loaded one is a no-op. Stored results are kept either way and
    /// reflect the pack they were processed under.
    pub fn reload(&mut self, pack: KnowledgePack) -> EngineResult<bool> {
        if pack_signature(&pack)? == self.compiled.signature {
            log::debug!("[PIPELINE] reload skipped, pack signature unchanged");
            return Ok(false);
        }
        let compiled = CompiledPack::compile(pack)?;
        log::debug!("[PIPELINE] pack reloaded, signature {}", compiled.signature);
        self.compiled = Arc::new(compiled);
        Ok(true)
    }

    // ─── Projections ───────────────────────────────────────────────────

    /// Audit projection for one processed record, by any member id of its
    /// group (an absorbed duplicate resolves to its consolidated record).
    /// Assembled from stored results only; scoring is never re-run.
    pub fn explain(&self, id: &str) -> Option<Explanation> {
        let index = *self.index_by_id.get(id)?;
        let record = self.processed.get(index)?;
        Some(Explanation {
            id: record.id().to_string(),
            name: record.name().to_string(),
            score: record.score(),
            status: record.status,
            threshold: record.threshold,
            reason: record.reason.clone(),
            fingerprint: record.fingerprint().to_string(),
            breakdown: record.scored.breakdown.clone(),
            matched_terms: record.scored.matched_terms.clone(),
            negative_terms: record.scored.negative_terms.clone(),
            blocked_by_gate: record.scored.blocked_by_gate.clone(),
            notes: record.scored.notes.clone(),
        })
    }

    /// Filter and sort the processed set. Ties always break by normalized
    /// name, then id, so equal inputs yield identical output order.
    pub fn query(&self, query: &ResultQuery) -> Vec<ProcessedItem> {
        let mut results: Vec<ProcessedItem> = self
            .processed
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            results.sort_by(|a, b| {
                let primary = match sort {
                    SortKey::Score => a
                        .score()
                        .partial_cmp(&b.score())
                        .unwrap_or(Ordering::Equal),
                    SortKey::Name => a
                        .scored
                        .item
                        .normalized_name
                        .cmp(&b.scored.item.normalized_name),
                    SortKey::Category => a
                        .scored
                        .item
                        .normalized_category
                        .cmp(&b.scored.item.normalized_category),
                };
                let primary = if query.ascending {
                    primary
                } else {
                    primary.reverse()
                };
                primary
                    .then_with(|| {
                        a.scored
                            .item
                            .normalized_name
                            .cmp(&b.scored.item.normalized_name)
                    })
                    .then_with(|| a.id().cmp(b.id()))
            });
        }
        results
    }

    /// Aggregate counts, reduced purely from the stored set.
    pub fn summary(&self) -> EngineSummary {
        let mut summary = EngineSummary {
            total: self.processed.len(),
            ..Default::default()
        };
        for record in &self.processed {
            match record.status {
                DecisionStatus::Accepted => summary.accepted += 1,
                DecisionStatus::Review => summary.review += 1,
                DecisionStatus::Rejected => summary.rejected += 1,
            }
            let category = &record.scored.item.normalized_category;
            let key = if category.is_empty() {
                UNCATEGORIZED_KEY.to_string()
            } else {
                category.clone()
            };
            *summary.per_category.entry(key).or_insert(0) += 1;
        }
        summary
    }
}

// ==================== CLASSIFY & DECIDE ====================

fn classify_with(
    pack: &CompiledPack,
    strategy: ClassifierStrategy,
    item: &NormalizedItem,
) -> EngineResult<ScoredItem> {
    match strategy {
        ClassifierStrategy::Standard => Ok(score_item(pack, item)),
        ClassifierStrategy::FastPath => fast_path::classify_fast(pack, item),
    }
}

/// Decision rule: `score ≥ category threshold` accepts (the threshold
/// table falls back to the global accept bound for unknown categories),
/// `score ≥ review lower bound` sends to review, anything lower rejects.
/// The reason string always cites the score and the bound it was
/// compared against.
fn decide(pack: &CompiledPack, scored: ScoredItem, group: &GroupedRecord) -> ProcessedItem {
    let threshold = pack
        .thresholds
        .for_category(scored.item.item.category.as_deref());
    let review_bound = pack.thresholds.review_lower_bound;

    let (status, reason) = if scored.score >= threshold {
        (
            DecisionStatus::Accepted,
            format!(
                "score {:.1} meets accept threshold {:.1}",
                scored.score, threshold
            ),
        )
    } else if scored.score >= review_bound {
        (
            DecisionStatus::Review,
            format!(
                "score {:.1} below accept threshold {:.1} but at or above review bound {:.1}",
                scored.score, threshold, review_bound
            ),
        )
    } else {
        (
            DecisionStatus::Rejected,
            format!(
                "score {:.1} below review bound {:.1}",
                scored.score, review_bound
            ),
        )
    };

    ProcessedItem {
        scored,
        status,
        threshold,
        reason,
        group_id: Some(group.group_id.clone()),
        variant_count: group.variant_count().max(1),
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
