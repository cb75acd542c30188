use super::*;

use crate::index::TokenIndex;
use crate::knowledge::{AliasEntry, KnowledgePack, NegativeRules, Taxonomy, WeightConfig};
use crate::pipeline::Engine;

fn mobility_pack() -> KnowledgePack {
    let mut categories = BTreeMap::new();
    categories.insert(
        "Mobility".to_string(),
        vec![
            "wheelchair".to_string(),
            "walker".to_string(),
            "crutches".to_string(),
        ],
    );
    let mut tag_weights = BTreeMap::new();
    tag_weights.insert("mobility".to_string(), 12.0);

    KnowledgePack {
        taxonomy: Taxonomy { categories },
        aliases: vec![AliasEntry {
            canonical: "wheelchair".to_string(),
            variants: vec![],
            tags: vec!["mobility".to_string()],
            strong: true,
            category: Some("Mobility".to_string()),
        }],
        negatives: NegativeRules {
            hard_blockers: vec!["surgical".to_string()],
            soft_demotions: vec!["toy".to_string()],
            ..Default::default()
        },
        weights: WeightConfig {
            tag_weights,
            ..Default::default()
        },
        variant_patterns: vec![],
        domain_codes: BTreeMap::new(),
        brands: BTreeMap::new(),
        context_boosts: vec![],
        stop_words: vec![],
    }
}

/// One accepted, two review, one gate-rejected item; four distinct groups.
fn batch_items() -> Vec<CatalogItem> {
    let mut categorized = CatalogItem::new("m1", "Manual Wheelchair Large");
    categorized.category = Some("Mobility".to_string());
    vec![
        categorized,
        CatalogItem::new("m2", "Toy Walker"),
        CatalogItem::new("m3", "Office Stapler"),
        CatalogItem::new("m4", "Surgical Scalpel Set"),
    ]
}

#[test]
fn test_full_run_reports_counts_and_progress() {
    let engine = Engine::new(mobility_pack(), ClassifierStrategy::Standard).unwrap();
    let options = BatchOptions {
        chunk_size: 2,
        cancel: None,
    };

    let mut events: Vec<BatchProgress> = Vec::new();
    let run = engine.run_batch(&batch_items(), &options, |progress| events.push(progress));

    assert_eq!(
        events,
        vec![
            BatchProgress {
                phase: BatchPhase::Normalizing,
                done: 0,
                total: 4
            },
            BatchProgress {
                phase: BatchPhase::Normalizing,
                done: 4,
                total: 4
            },
            BatchProgress {
                phase: BatchPhase::Grouping,
                done: 4,
                total: 4
            },
            BatchProgress {
                phase: BatchPhase::Classifying,
                done: 2,
                total: 4
            },
            BatchProgress {
                phase: BatchPhase::Classifying,
                done: 4,
                total: 4
            },
        ]
    );

    let report = &run.report;
    assert_eq!(report.status, BatchStatus::Completed);
    assert_eq!(report.input_count, 4);
    assert_eq!(report.group_count, 4);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.review, 2);
    assert_eq!(report.rejected, 1);
    assert!(report.failures.is_empty());
    assert_eq!(report.per_category.len(), 2);
    assert_eq!(report.per_category.get("mobility"), Some(&1));
    assert_eq!(report.per_category.get("uncategorized"), Some(&3));
    // UUID text form
    assert_eq!(report.run_id.len(), 36);
    assert!(report.finished_at >= report.started_at);

    assert_eq!(run.processed.len(), 4);
    assert_eq!(run.groups.len(), 4);
}

#[test]
fn test_cancel_before_grouping_stops_early() {
    let pack = CompiledPack::compile(mobility_pack()).unwrap();
    let options = BatchOptions {
        chunk_size: 2,
        cancel: Some(Arc::new(AtomicBool::new(true))),
    };

    let mut events: Vec<BatchProgress> = Vec::new();
    let run = run_batch(
        &pack,
        ClassifierStrategy::Standard,
        &batch_items(),
        &options,
        |progress| events.push(progress),
    );

    assert_eq!(run.report.status, BatchStatus::Cancelled);
    assert_eq!(run.report.input_count, 4);
    assert_eq!(run.report.group_count, 0);
    assert!(run.processed.is_empty());
    assert!(run.groups.is_empty());
    // Only the two normalization events fired.
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| event.phase == BatchPhase::Normalizing));
}

#[test]
fn test_cancel_between_chunks_keeps_completed_work() {
    let pack = CompiledPack::compile(mobility_pack()).unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let options = BatchOptions {
        chunk_size: 1,
        cancel: Some(flag.clone()),
    };

    let run = run_batch(
        &pack,
        ClassifierStrategy::Standard,
        &batch_items(),
        &options,
        |progress| {
            if progress.phase == BatchPhase::Classifying && progress.done >= 2 {
                flag.store(true, Ordering::Relaxed);
            }
        },
    );

    assert_eq!(run.report.status, BatchStatus::Cancelled);
    // Two single-group chunks finished before the flag was honored.
    assert_eq!(run.processed.len(), 2);
    assert_eq!(run.report.accepted, 1);
    assert_eq!(run.report.review, 1);
    assert_eq!(run.report.rejected, 0);
    assert_eq!(run.groups.len(), 4);
}

#[test]
fn test_each_run_gets_its_own_id() {
    let pack = CompiledPack::compile(mobility_pack()).unwrap();
    let items = batch_items();
    let first = run_batch(
        &pack,
        ClassifierStrategy::Standard,
        &items,
        &BatchOptions::default(),
        |_| {},
    );
    let second = run_batch(
        &pack,
        ClassifierStrategy::Standard,
        &items,
        &BatchOptions::default(),
        |_| {},
    );
    assert_ne!(first.report.run_id, second.report.run_id);
}

#[test]
fn test_group_failure_is_isolated_not_fatal() {
    // An unfinalized token index makes every fast-path search fail while
    // normalization and grouping still succeed.
    let mut broken = CompiledPack::compile(mobility_pack()).unwrap();
    broken.token_index = TokenIndex::new(broken.tokenizer.clone());

    let items = vec![
        CatalogItem::new("f1", "Wheelchair"),
        CatalogItem::new("f2", "Walker"),
    ];
    let run = run_batch(
        &broken,
        ClassifierStrategy::FastPath,
        &items,
        &BatchOptions::default(),
        |_| {},
    );

    let report = &run.report;
    assert_eq!(report.status, BatchStatus::Completed);
    assert_eq!(report.group_count, 2);
    assert!(run.processed.is_empty());
    assert_eq!(report.accepted + report.review + report.rejected, 0);
    assert!(report.per_category.is_empty());

    assert_eq!(report.failures.len(), 2);
    let failure = &report.failures[0];
    assert_eq!(failure.item_id, "f1");
    assert_eq!(failure.name, "Wheelchair");
    assert!(failure.error.starts_with("Item processing failed:"));
    assert!(failure.error.contains("Index not ready"));
}
