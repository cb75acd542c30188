//! Weighted, gated scoring with a full audit trail.
//!
//! Scoring starts from the configured base score, runs gate evaluation
//! first (a hard block short-circuits everything), then accumulates
//! per-field include contributions, bonuses and penalties into a named
//! breakdown. The result always carries the breakdown and both term
//! lists, never just a number.

use std::collections::BTreeSet;

use crate::knowledge::{CompiledPack, FieldWeights};
use crate::matching::{contains_term, match_term};
use crate::types::{
    cap_notes, cap_term_hits, FieldKind, GateBlock, MatchStrategy, NormalizedItem,
    ScoreBreakdown, ScoredItem, TermHit,
};

pub mod gates;

pub use gates::evaluate_gates;

pub(crate) const SCORE_MIN: f32 = 0.0;
pub(crate) const SCORE_MAX: f32 = 100.0;

/// Score one normalized item against the compiled pack.
pub fn score_item(pack: &CompiledPack, item: &NormalizedItem) -> ScoredItem {
    let weights = &pack.pack.weights;
    let combined = item.combined_text();

    let mut breakdown = ScoreBreakdown {
        base: weights.base_score,
        ..Default::default()
    };
    let mut matched_terms: Vec<TermHit> = Vec::new();
    let mut negative_terms: Vec<TermHit> = Vec::new();
    let mut notes: Vec<String> = Vec::new();

    // Gate evaluation happens first and short-circuits to a hard block.
    if let Some(block) = evaluate_gates(&combined, &pack.gates) {
        breakdown.gate_penalty = -weights.hard_block_penalty;
        negative_terms.push(TermHit {
            term: block.term.clone(),
            canonical: None,
            field: FieldKind::Combined,
            strategy: MatchStrategy::Exact,
            confidence: 1.0,
            contribution: -weights.hard_block_penalty,
        });
        notes.push(block.reason.clone());
        return finish(item, breakdown, matched_terms, negative_terms, Some(block), notes);
    }

    apply_include_contributions(pack, item, &mut breakdown, &mut matched_terms);
    apply_soft_demotions(pack, item, &mut breakdown, &mut negative_terms);
    apply_diagnostic_penalty(pack, &combined, weights.diagnostic_penalty, &mut breakdown, &mut negative_terms);
    apply_category_bonus(pack, item, &combined, &mut breakdown, &mut notes);

    if !matched_terms.is_empty() {
        notes.push(format!("{} positive term(s) matched", matched_terms.len()));
    }
    if breakdown.strong_term_bonus > 0.0 {
        notes.push("strong domain term present".to_string());
    }

    #[cfg(feature = "debug_matcher")]
    log::debug!(
        "[SCORER] item={} raw_sum={:.2} positives={} negatives={}",
        item.item.id,
        breakdown.sum(),
        matched_terms.len(),
        negative_terms.len()
    );

    finish(item, breakdown, matched_terms, negative_terms, None, notes)
}

fn finish(
    item: &NormalizedItem,
    breakdown: ScoreBreakdown,
    mut matched_terms: Vec<TermHit>,
    mut negative_terms: Vec<TermHit>,
    blocked_by_gate: Option<GateBlock>,
    mut notes: Vec<String>,
) -> ScoredItem {
    cap_term_hits(&mut matched_terms);
    cap_term_hits(&mut negative_terms);
    cap_notes(&mut notes);
    ScoredItem {
        item: item.clone(),
        score: breakdown.sum().clamp(SCORE_MIN, SCORE_MAX),
        breakdown,
        matched_terms,
        negative_terms,
        blocked_by_gate,
        relevant: None,
        notes,
    }
}

// ─── Contributions ─────────────────────────────────────────────────────

/// Per-field include-term matching. A term can hit several fields; each
/// hit contributes `weight * fieldWeight * confidence` into that field's
/// breakdown slot. Exact/synonym bonuses accrue once per matched term,
/// the strong bonus once per distinct strong canonical.
fn apply_include_contributions(
    pack: &CompiledPack,
    item: &NormalizedItem,
    breakdown: &mut ScoreBreakdown,
    matched_terms: &mut Vec<TermHit>,
) {
    let weights = &pack.pack.weights;
    let fields = scored_fields(item, &weights.field_weights);
    let mut strong_canonicals: BTreeSet<&str> = BTreeSet::new();

    for include in &pack.include_terms {
        let mut term_matched = false;

        for (field, text, field_weight) in fields {
            if text.is_empty() {
                continue;
            }
            let Some(matched) = match_term(&include.term, text) else {
                continue;
            };
            let contribution = include.weight * field_weight * matched.confidence;
            add_field_contribution(breakdown, field, contribution);
            matched_terms.push(TermHit {
                term: include.term.clone(),
                canonical: include.canonical.clone(),
                field,
                strategy: matched.strategy,
                confidence: matched.confidence,
                contribution,
            });
            term_matched = true;
        }

        if term_matched {
            match &include.canonical {
                None => breakdown.exact_bonus += weights.exact_bonus,
                Some(_) => breakdown.synonym_bonus += weights.synonym_bonus,
            }
            if include.strong {
                strong_canonicals.insert(include.canonical.as_deref().unwrap_or(&include.term));
            }
        }
    }

    breakdown.strong_term_bonus = strong_canonicals.len() as f32 * weights.strong_term_bonus;
}

/// Soft demotions penalize per field they appear in, scaled by the field
/// weight, without ever blocking.
fn apply_soft_demotions(
    pack: &CompiledPack,
    item: &NormalizedItem,
    breakdown: &mut ScoreBreakdown,
    negative_terms: &mut Vec<TermHit>,
) {
    let weights = &pack.pack.weights;
    let fields = scored_fields(item, &weights.field_weights);

    for demotion in &pack.gates.soft_demotions {
        for (field, text, field_weight) in fields {
            if text.is_empty() || !contains_term(demotion, text) {
                continue;
            }
            let contribution = -(weights.soft_ignore_penalty * field_weight);
            breakdown.ignore_penalty += contribution;
            negative_terms.push(TermHit {
                term: demotion.clone(),
                canonical: None,
                field,
                strategy: MatchStrategy::Exact,
                confidence: 1.0,
                contribution,
            });
        }
    }
}

/// Diagnostic noise: count of present terms × fixed penalty.
fn apply_diagnostic_penalty(
    pack: &CompiledPack,
    combined: &str,
    penalty: f32,
    breakdown: &mut ScoreBreakdown,
    negative_terms: &mut Vec<TermHit>,
) {
    for diagnostic in &pack.gates.diagnostic_terms {
        if !contains_term(diagnostic, combined) {
            continue;
        }
        breakdown.diagnostic_penalty -= penalty;
        negative_terms.push(TermHit {
            term: diagnostic.clone(),
            canonical: None,
            field: FieldKind::Combined,
            strategy: MatchStrategy::Exact,
            confidence: 1.0,
            contribution: -penalty,
        });
    }
}

/// One-shot bonus when a taxonomy keyword of the item's own category is
/// present in the combined text.
fn apply_category_bonus(
    pack: &CompiledPack,
    item: &NormalizedItem,
    combined: &str,
    breakdown: &mut ScoreBreakdown,
    notes: &mut Vec<String>,
) {
    if item.normalized_category.is_empty() {
        return;
    }
    let Some(keywords) = pack.category_keywords.get(&item.normalized_category) else {
        return;
    };
    if keywords.iter().any(|keyword| contains_term(keyword, combined)) {
        breakdown.category_match = pack.pack.weights.category_match_bonus;
        notes.push(format!(
            "category \"{}\" confirmed by taxonomy keyword",
            item.normalized_category
        ));
    }
}

fn scored_fields<'a>(
    item: &'a NormalizedItem,
    weights: &FieldWeights,
) -> [(FieldKind, &'a str, f32); 4] {
    [
        (FieldKind::Name, item.normalized_name.as_str(), weights.name),
        (FieldKind::Brand, item.normalized_brand.as_str(), weights.brand),
        (FieldKind::Model, item.normalized_model.as_str(), weights.model),
        (
            FieldKind::Description,
            item.normalized_description.as_str(),
            weights.description,
        ),
    ]
}

fn add_field_contribution(breakdown: &mut ScoreBreakdown, field: FieldKind, amount: f32) {
    match field {
        FieldKind::Name => breakdown.name_match += amount,
        FieldKind::Brand => breakdown.brand_match += amount,
        FieldKind::Model => breakdown.model_match += amount,
        FieldKind::Description => breakdown.description_match += amount,
        FieldKind::Combined => {}
    }
}

#[cfg(test)]
#[path = "tests/scoring_tests.rs"]
mod tests;
