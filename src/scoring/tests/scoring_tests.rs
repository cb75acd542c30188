use super::*;

use std::collections::BTreeMap;

use crate::knowledge::{AliasEntry, KnowledgePack, NegativeRules, Taxonomy, WeightConfig};
use crate::text::{normalize_item, Tokenizer};
use crate::types::CatalogItem;

/// Mobility pack with one strong alias, a hard blocker, a soft demotion
/// and two diagnostic terms. Default weights throughout.
fn mobility_pack() -> CompiledPack {
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

    let pack = KnowledgePack {
        taxonomy: Taxonomy { categories },
        aliases: vec![AliasEntry {
            canonical: "wheelchair".to_string(),
            variants: vec!["كرسي متحرك".to_string()],
            tags: vec!["mobility".to_string()],
            strong: true,
            category: Some("Mobility".to_string()),
        }],
        negatives: NegativeRules {
            hard_blockers: vec!["surgical".to_string()],
            soft_demotions: vec!["toy".to_string()],
            diagnostic_terms: vec!["reagent".to_string(), "assay".to_string()],
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
    };
    CompiledPack::compile(pack).unwrap()
}

fn normalized_item(id: &str, name: &str) -> NormalizedItem {
    normalize_item(&CatalogItem::new(id, name), &Tokenizer::new())
}

#[test]
fn test_include_term_accumulates_name_match_and_bonuses() {
    let pack = mobility_pack();
    let item = normalized_item("m1", "Manual Wheelchair Large");

    let scored = score_item(&pack, &item);

    // weight 12 (mobility tag beats default 10) × name weight 1.0 × exact 1.0
    assert!((scored.breakdown.name_match - 12.0).abs() < 1e-3);
    assert!((scored.breakdown.exact_bonus - 10.0).abs() < 1e-3);
    assert!((scored.breakdown.strong_term_bonus - 15.0).abs() < 1e-3);
    // 40 base + 12 + 10 + 15
    assert!((scored.score - 77.0).abs() < 1e-3);
    assert!(scored.blocked_by_gate.is_none());
    assert!(scored.relevant.is_none());

    assert_eq!(scored.matched_terms.len(), 1);
    let hit = &scored.matched_terms[0];
    assert_eq!(hit.term, "wheelchair");
    assert_eq!(hit.field, FieldKind::Name);
    assert_eq!(hit.strategy, MatchStrategy::Exact);
    assert!(hit.canonical.is_none());
}

#[test]
fn test_hard_blocker_blocks_and_zeroes_score() {
    let pack = mobility_pack();
    let item = normalized_item("s1", "Surgical Scalpel Set");

    let scored = score_item(&pack, &item);

    let block = scored.blocked_by_gate.as_ref().unwrap();
    assert_eq!(block.term, "surgical");
    assert!((scored.breakdown.gate_penalty + 100.0).abs() < 1e-3);
    // 40 base - 100 gate penalty, clamped at the floor.
    assert_eq!(scored.score, 0.0);
    assert_eq!(scored.negative_terms.len(), 1);
    assert!((scored.negative_terms[0].contribution + 100.0).abs() < 1e-3);
    assert!(scored.notes.iter().any(|note| note.contains("surgical")));
}

#[test]
fn test_gate_block_short_circuits_positive_scoring() {
    let pack = mobility_pack();
    let item = normalized_item("s2", "Surgical Wheelchair");

    let scored = score_item(&pack, &item);

    assert!(scored.blocked_by_gate.is_some());
    assert!(scored.matched_terms.is_empty());
    assert_eq!(scored.breakdown.name_match, 0.0);
}

#[test]
fn test_arabic_variant_earns_synonym_bonus_with_canonical() {
    let pack = mobility_pack();
    let item = normalized_item("a1", "كرسي متحرك كبير");

    let scored = score_item(&pack, &item);

    assert!((scored.breakdown.name_match - 12.0).abs() < 1e-3);
    assert!((scored.breakdown.synonym_bonus - 5.0).abs() < 1e-3);
    assert_eq!(scored.breakdown.exact_bonus, 0.0);
    // Strong bonus keys on the canonical identity, not the spelling.
    assert!((scored.breakdown.strong_term_bonus - 15.0).abs() < 1e-3);
    assert!((scored.score - 72.0).abs() < 1e-3);

    assert_eq!(scored.matched_terms[0].canonical.as_deref(), Some("wheelchair"));
}

#[test]
fn test_description_match_scaled_by_field_weight() {
    let pack = mobility_pack();
    let mut item = normalized_item("d1", "Chair");
    item.normalized_description = "foldable wheelchair with brakes".to_string();

    let scored = score_item(&pack, &item);

    // 12 × description weight 0.4
    assert!((scored.breakdown.description_match - 4.8).abs() < 1e-3);
    assert_eq!(scored.breakdown.name_match, 0.0);
    assert_eq!(scored.matched_terms[0].field, FieldKind::Description);
}

#[test]
fn test_soft_demotion_penalizes_without_blocking() {
    let pack = mobility_pack();
    let item = normalized_item("t1", "Toy Walker");

    let scored = score_item(&pack, &item);

    assert!(scored.blocked_by_gate.is_none());
    // walker: 10 × 1.0 exact; toy: -12 × 1.0 name weight
    assert!((scored.breakdown.name_match - 10.0).abs() < 1e-3);
    assert!((scored.breakdown.ignore_penalty + 12.0).abs() < 1e-3);
    assert!((scored.score - 48.0).abs() < 1e-3);

    assert_eq!(scored.negative_terms.len(), 1);
    assert_eq!(scored.negative_terms[0].term, "toy");
    assert!((scored.negative_terms[0].contribution + 12.0).abs() < 1e-3);
}

#[test]
fn test_diagnostic_terms_penalize_per_occurrence() {
    let pack = mobility_pack();
    let item = normalized_item("r1", "Reagent Assay Analyzer");

    let scored = score_item(&pack, &item);

    // two diagnostic terms × 8
    assert!((scored.breakdown.diagnostic_penalty + 16.0).abs() < 1e-3);
    assert!((scored.score - 24.0).abs() < 1e-3);
    assert_eq!(scored.negative_terms.len(), 2);
}

#[test]
fn test_category_bonus_requires_taxonomy_keyword_presence() {
    let pack = mobility_pack();

    let mut item = normalized_item("c1", "Manual Wheelchair");
    item.normalized_category = "mobility".to_string();
    let scored = score_item(&pack, &item);
    assert!((scored.breakdown.category_match - 8.0).abs() < 1e-3);
    assert!((scored.score - 85.0).abs() < 1e-3);

    // Same category label but no taxonomy keyword in the text.
    let mut unrelated = normalized_item("c2", "Oxygen Concentrator");
    unrelated.normalized_category = "mobility".to_string();
    let scored = score_item(&pack, &unrelated);
    assert_eq!(scored.breakdown.category_match, 0.0);
}

#[test]
fn test_score_clamped_to_upper_bound() {
    let pack = mobility_pack();
    let item = normalized_item("x1", "Wheelchair Walker Crutches");

    let scored = score_item(&pack, &item);

    // 40 + (12 + 10 + 10) name + 30 exact + 15 strong = 117 before clamping.
    assert!(scored.breakdown.sum() > 100.0);
    assert_eq!(scored.score, 100.0);
}

#[test]
fn test_no_matches_leaves_base_score() {
    let pack = mobility_pack();
    let item = normalized_item("n1", "Office Stapler");

    let scored = score_item(&pack, &item);

    assert!((scored.score - 40.0).abs() < 1e-3);
    assert!(scored.matched_terms.is_empty());
    assert!(scored.negative_terms.is_empty());
}
