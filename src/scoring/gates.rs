//! Gate evaluation: hard blockers, regex blockers and conditional includes.

use crate::knowledge::compiler::CompiledConditional;
use crate::knowledge::GateTables;
use crate::matching::contains_term;
use crate::types::GateBlock;

/// Evaluate gate rules against the combined normalized text.
///
/// Runs before any positive scoring and can short-circuit the whole
/// item. A present hard blocker blocks unless a conditional include
/// allows it: the rule's trigger must equal the blocker, its
/// `requires_any` set must be satisfied (an empty set is vacuously
/// satisfied) and none of its `blocked_by` terms may be present.
pub fn evaluate_gates(combined_text: &str, gates: &GateTables) -> Option<GateBlock> {
    for blocker in &gates.hard_blockers {
        if !contains_term(blocker, combined_text) {
            continue;
        }
        if let Some(rule) = allowing_conditional(blocker, combined_text, gates) {
            log::debug!(
                "blocker {:?} allowed by conditional include (requires {:?})",
                blocker,
                rule.requires_any
            );
            continue;
        }
        return Some(GateBlock {
            term: blocker.clone(),
            reason: format!("hard blocker \"{blocker}\" present"),
        });
    }

    for pattern in &gates.blocker_patterns {
        if pattern.is_match(combined_text) {
            return Some(GateBlock {
                term: pattern.label.clone(),
                reason: format!("blocker pattern \"{}\" matched", pattern.label),
            });
        }
    }

    None
}

fn allowing_conditional<'a>(
    blocker: &str,
    combined_text: &str,
    gates: &'a GateTables,
) -> Option<&'a CompiledConditional> {
    gates.conditional_includes.iter().find(|rule| {
        rule.trigger == blocker
            && (rule.requires_any.is_empty()
                || rule
                    .requires_any
                    .iter()
                    .any(|term| contains_term(term, combined_text)))
            && !rule
                .blocked_by
                .iter()
                .any(|term| contains_term(term, combined_text))
    })
}

#[cfg(test)]
#[path = "tests/gates_tests.rs"]
mod tests;
