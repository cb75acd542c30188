//! Chunked, cancellable batch driver over the classification pipeline.
//!
//! Very large inputs are normalized and grouped up front, then
//! classified chunk by chunk with rayon parallelism inside each chunk.
//! The cancel flag is checked between chunks only: cancellation stops
//! submitting further chunks while every completed chunk's results stay
//! valid. A failure while classifying one group is isolated as an error
//! marker in the report and never aborts the rest of the batch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::dedupe;
use crate::knowledge::CompiledPack;
use crate::text::normalize_item;
use crate::types::{CatalogItem, DecisionStatus, EngineError, GroupedRecord, NormalizedItem, ProcessedItem};

use super::ClassifierStrategy;

/// Groups classified per chunk when the caller does not override it.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

// ==================== OPTIONS & REPORT TYPES ====================

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Groups classified per parallel chunk; `0` falls back to
    /// [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Cooperative cancel flag, checked between chunks.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    Normalizing,
    Grouping,
    Classifying,
}

/// Progress event emitted to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub phase: BatchPhase,
    pub done: usize,
    pub total: usize,
}

/// One isolated per-group failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_id: String,
    pub name: String,
    pub error: String,
}

/// Aggregate report for one batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: String,
    pub status: BatchStatus,
    pub input_count: usize,
    pub group_count: usize,
    pub accepted: usize,
    pub review: usize,
    pub rejected: usize,
    /// Record counts keyed by normalized category; records without a
    /// category land under `uncategorized`.
    pub per_category: BTreeMap<String, usize>,
    pub failures: Vec<ItemFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Full result of one batch run: the decided records, the dedupe groups
/// backing them, and the aggregate report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub processed: Vec<ProcessedItem>,
    pub groups: Vec<GroupedRecord>,
    pub report: BatchReport,
}

// ==================== DRIVER ====================

/// Run the full pipeline over one input batch in cancellable chunks.
pub fn run_batch<F>(
    pack: &CompiledPack,
    strategy: ClassifierStrategy,
    items: &[CatalogItem],
    options: &BatchOptions,
    mut on_progress: F,
) -> BatchRun
where
    F: FnMut(BatchProgress),
{
    let started_at = Utc::now();
    let run_id = Uuid::new_v4().to_string();
    let chunk_size = if options.chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        options.chunk_size
    };

    on_progress(BatchProgress {
        phase: BatchPhase::Normalizing,
        done: 0,
        total: items.len(),
    });
    let normalized: Vec<NormalizedItem> = items
        .par_iter()
        .map(|item| normalize_item(item, &pack.tokenizer))
        .collect();
    on_progress(BatchProgress {
        phase: BatchPhase::Normalizing,
        done: items.len(),
        total: items.len(),
    });

    let mut status = BatchStatus::Completed;
    let mut groups: Vec<GroupedRecord> = Vec::new();
    let mut processed: Vec<ProcessedItem> = Vec::new();
    let mut failures: Vec<ItemFailure> = Vec::new();

    if is_cancelled(options) {
        status = BatchStatus::Cancelled;
    } else {
        groups = dedupe::group_items(&normalized, &pack.variant_patterns, &pack.tokenizer);
        on_progress(BatchProgress {
            phase: BatchPhase::Grouping,
            done: groups.len(),
            total: groups.len(),
        });

        let total = groups.len();
        for chunk in groups.chunks(chunk_size) {
            if is_cancelled(options) {
                status = BatchStatus::Cancelled;
                break;
            }
            let outcomes: Vec<Result<ProcessedItem, ItemFailure>> = chunk
                .par_iter()
                .map(|group| classify_group(pack, strategy, group))
                .collect();
            for outcome in outcomes {
                match outcome {
                    Ok(record) => processed.push(record),
                    Err(failure) => failures.push(failure),
                }
            }
            on_progress(BatchProgress {
                phase: BatchPhase::Classifying,
                done: processed.len() + failures.len(),
                total,
            });
        }
    }

    let report = build_report(
        run_id, status, items.len(), &groups, &processed, failures, started_at,
    );
    log::debug!(
        "[BATCH {}] {:?}: {} groups, {} decided, {} failed",
        report.run_id,
        report.status,
        report.group_count,
        report.accepted + report.review + report.rejected,
        report.failures.len()
    );

    BatchRun {
        processed,
        groups,
        report,
    }
}

fn classify_group(
    pack: &CompiledPack,
    strategy: ClassifierStrategy,
    group: &GroupedRecord,
) -> Result<ProcessedItem, ItemFailure> {
    match super::classify_with(pack, strategy, &group.base) {
        Ok(scored) => Ok(super::decide(pack, scored, group)),
        Err(error) => Err(ItemFailure {
            item_id: group.base.item.id.clone(),
            name: group.base.item.name.clone(),
            error: EngineError::Item(error.to_string()).to_string(),
        }),
    }
}

fn build_report(
    run_id: String,
    status: BatchStatus,
    input_count: usize,
    groups: &[GroupedRecord],
    processed: &[ProcessedItem],
    failures: Vec<ItemFailure>,
    started_at: DateTime<Utc>,
) -> BatchReport {
    let mut accepted = 0;
    let mut review = 0;
    let mut rejected = 0;
    let mut per_category: BTreeMap<String, usize> = BTreeMap::new();
    for record in processed {
        match record.status {
            DecisionStatus::Accepted => accepted += 1,
            DecisionStatus::Review => review += 1,
            DecisionStatus::Rejected => rejected += 1,
        }
        let category = &record.scored.item.normalized_category;
        let key = if category.is_empty() {
            super::UNCATEGORIZED_KEY.to_string()
        } else {
            category.clone()
        };
        *per_category.entry(key).or_insert(0) += 1;
    }

    BatchReport {
        run_id,
        status,
        input_count,
        group_count: groups.len(),
        accepted,
        review,
        rejected,
        per_category,
        failures,
        started_at,
        finished_at: Utc::now(),
    }
}

fn is_cancelled(options: &BatchOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

#[cfg(test)]
#[path = "tests/batch_tests.rs"]
mod tests;
