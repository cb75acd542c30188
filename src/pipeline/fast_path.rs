//! Pre-compiled classification cascade for very large batches.
//!
//! Stages run in strict order. The bloom pre-filter and the gate check
//! can end the cascade outright; the remaining stages accumulate signed
//! confidence from the retrieval structures. The accumulated sum is
//! scaled by the pack's configured confidence multiplier, clamped to
//! [0, 100] and compared against the high-confidence threshold to set
//! the relevance flag. Every stage that fires appends a short literal
//! note so the result stays auditable after the fact.

use crate::index::FuzzyHit;
use crate::knowledge::CompiledPack;
use crate::matching::contains_term;
use crate::scoring::{evaluate_gates, SCORE_MAX, SCORE_MIN};
use crate::types::{
    cap_notes, cap_term_hits, EngineResult, FieldKind, GateBlock, MatchStrategy, NormalizedItem,
    ScoreBreakdown, ScoredItem, TermHit,
};

/// Classify one normalized item through the staged cascade.
///
/// Stage order: bloom pre-filter, hard gates, domain-code prefix rule,
/// token-index retrieval, trie fuzzy fallback (only when exact token
/// retrieval found nothing), context keyword co-occurrence, brand
/// reputation.
pub fn classify_fast(pack: &CompiledPack, item: &NormalizedItem) -> EngineResult<ScoredItem> {
    let weights = &pack.pack.weights;
    let fast = &weights.fast_path;
    let combined = item.combined_text();

    let mut breakdown = ScoreBreakdown::default();
    let mut matched_terms: Vec<TermHit> = Vec::new();
    let mut negative_terms: Vec<TermHit> = Vec::new();
    let mut notes: Vec<String> = Vec::new();

    // Stage 1: bloom pre-filter. An item with no token in the domain
    // vocabulary cannot match anything downstream.
    if !item
        .tokens
        .iter()
        .any(|token| pack.vocabulary.might_contain(token))
    {
        notes.push("no token in domain vocabulary".to_string());
        return Ok(finish(
            pack,
            item,
            breakdown,
            matched_terms,
            negative_terms,
            None,
            notes,
        ));
    }

    // Stage 2: hard gates, same tables as the standard scorer.
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
        return Ok(finish(
            pack,
            item,
            breakdown,
            matched_terms,
            negative_terms,
            Some(block),
            notes,
        ));
    }

    // Stage 3: external classification code, longest prefix rule wins.
    if let Some(code) = item.item.domain_code.as_deref() {
        if let Some(rule) = pack.domain_code_rule(code) {
            breakdown.domain_code = rule.score;
            notes.push(format!(
                "domain code \"{}\" scored {:+.1}",
                code.trim(),
                rule.score
            ));
            if let Some(category) = &rule.category {
                if item.normalized_category.is_empty() {
                    notes.push(format!("domain code suggests category \"{category}\""));
                }
            }
        }
    }

    // Stage 4: TF-IDF retrieval over the combined text.
    let hits = pack.token_index.search(&combined, fast.token_index_top_k)?;
    match hits.first() {
        Some(best) => {
            breakdown.token_index = best.score;
            if let Some(term) = pack.token_index.term(best.term_id) {
                matched_terms.push(TermHit {
                    term: term.normalized_term.clone(),
                    canonical: None,
                    field: FieldKind::Combined,
                    strategy: MatchStrategy::Exact,
                    confidence: 1.0,
                    contribution: best.score,
                });
                notes.push(format!("token index best hit \"{}\"", term.normalized_term));
            }
        }
        // Stage 5: approximate completion, only as a fallback and always
        // penalized relative to exact token evidence.
        None => {
            if let Some((hit, weighted)) = best_fuzzy_hit(pack, item, fast.trie_top_k) {
                let contribution = weighted * fast.trie_penalty;
                breakdown.trie_fuzzy = contribution;
                matched_terms.push(TermHit {
                    term: hit.completion.clone(),
                    canonical: None,
                    field: FieldKind::Combined,
                    strategy: MatchStrategy::Fuzzy,
                    confidence: hit.similarity,
                    contribution,
                });
                notes.push(format!("fuzzy completion \"{}\"", hit.completion));
            }
        }
    }

    // Stage 6: context boosts fire only when every keyword co-occurs.
    for boost in &pack.context_boosts {
        if boost
            .keywords
            .iter()
            .all(|keyword| contains_term(keyword, &combined))
        {
            breakdown.context_boost += boost.boost;
            notes.push(format!("context boost: {}", boost.keywords.join(" + ")));
        }
    }

    // Stage 7: brand reputation.
    if !item.normalized_brand.is_empty() {
        if let Some(boost) = pack.brands.get(&item.normalized_brand) {
            breakdown.brand_boost = *boost;
            notes.push(format!("brand \"{}\" recognized", item.normalized_brand));
        }
    }

    Ok(finish(
        pack,
        item,
        breakdown,
        matched_terms,
        negative_terms,
        None,
        notes,
    ))
}

/// Best fuzzy completion across the item's tokens, weighted by the
/// completed term's static score.
fn best_fuzzy_hit(
    pack: &CompiledPack,
    item: &NormalizedItem,
    top_k: usize,
) -> Option<(FuzzyHit, f32)> {
    let mut best_hit: Option<FuzzyHit> = None;
    let mut best_score = 0.0_f32;
    for token in &item.tokens {
        for hit in pack.trie.fuzzy_top_k(token, top_k) {
            let weight = pack
                .token_index
                .term(hit.term_id)
                .map_or(0.0, |term| term.score);
            let weighted = hit.similarity * weight;
            if weighted > best_score {
                best_score = weighted;
                best_hit = Some(hit);
            }
        }
    }
    best_hit.map(|hit| (hit, best_score))
}

fn finish(
    pack: &CompiledPack,
    item: &NormalizedItem,
    breakdown: ScoreBreakdown,
    mut matched_terms: Vec<TermHit>,
    mut negative_terms: Vec<TermHit>,
    blocked_by_gate: Option<GateBlock>,
    mut notes: Vec<String>,
) -> ScoredItem {
    let fast = &pack.pack.weights.fast_path;
    let confidence = (breakdown.sum() * fast.confidence_scale).clamp(SCORE_MIN, SCORE_MAX);
    notes.push(format!(
        "confidence scale x{} applied",
        fast.confidence_scale
    ));

    #[cfg(feature = "debug_matcher")]
    log::debug!(
        "[FAST] item={} confidence={:.2} stages={:?}",
        item.item.id,
        confidence,
        notes
    );

    cap_term_hits(&mut matched_terms);
    cap_term_hits(&mut negative_terms);
    cap_notes(&mut notes);
    ScoredItem {
        item: item.clone(),
        score: confidence,
        breakdown,
        matched_terms,
        negative_terms,
        blocked_by_gate,
        relevant: Some(confidence >= fast.high_confidence_threshold),
        notes,
    }
}

#[cfg(test)]
#[path = "tests/fast_path_tests.rs"]
mod tests;
