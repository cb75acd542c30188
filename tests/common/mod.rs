//! Shared fixtures for the integration suites.
//!
//! The pack models a compact bilingual equipment domain: an
//! English/Arabic wheelchair vocabulary, one strong monitoring term,
//! a surgical hard blocker with a conditional exception, and enough
//! fast-path data (domain codes, brands, context boosts) to exercise
//! every cascade stage.

use std::sync::Once;

use medsift::{CatalogItem, KnowledgePack};

static INIT: Once = Once::new();

/// Install the test logger once per test binary.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Canonical v2 pack payload, loaded through the public schema path.
pub fn pack_json() -> String {
    r#"{
        "schema": "v2",
        "taxonomy": {
            "categories": {
                "mobility": ["wheelchair", "walker", "crutch"],
                "monitoring": ["monitor", "oximeter"]
            }
        },
        "aliases": [
            {
                "canonical": "wheelchair",
                "variants": ["كرسي متحرك"],
                "tags": ["mobility-core"],
                "category": "mobility"
            },
            {
                "canonical": "pulse oximeter",
                "variants": ["مقياس التأكسج"],
                "strong": true,
                "category": "monitoring"
            }
        ],
        "negatives": {
            "hardBlockers": ["surgical"],
            "blockerPatterns": [
                {"label": "veterinary", "pattern": "\\bvet(erinary)?\\b"}
            ],
            "softDemotions": ["toy"],
            "diagnosticTerms": ["reagent"],
            "conditionalIncludes": [
                {
                    "trigger": "surgical",
                    "requiresAny": ["table"],
                    "blockedBy": ["disposable"]
                }
            ]
        },
        "weights": {
            "categoryThresholds": {"mobility": 55.0},
            "tagWeights": {"mobility-core": 12.0}
        },
        "variantPatterns": [
            {"label": "size", "pattern": "\\b(small|medium|large)\\b"}
        ],
        "domainCodes": {
            "331": {"score": 12.0, "category": "mobility"}
        },
        "brands": {"Acme": 5.0},
        "contextBoosts": [
            {"keywords": ["wheelchair", "electric"], "boost": 6.0}
        ]
    }"#
    .to_string()
}

pub fn fixture_pack() -> KnowledgePack {
    medsift::knowledge::load_pack(&pack_json()).expect("fixture pack loads")
}

/// Bare item with only id and name set.
pub fn item(id: &str, name: &str) -> CatalogItem {
    CatalogItem::new(id, name)
}
