//! Versioned pack loading.
//!
//! Packs declare their shape through an explicit `schema` tag; each
//! known version has a dedicated adapter into the canonical
//! [`KnowledgePack`]. A payload without a recognized tag is rejected
//! outright, never shape-sniffed.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::knowledge::{
    AliasEntry, KnowledgePack, NegativeRules, PatternSpec, Taxonomy, WeightConfig,
};
use crate::types::{EngineError, EngineResult};

/// All recognized pack layouts, discriminated by the `schema` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "schema")]
pub enum VersionedPack {
    /// Legacy flat layout: bare alias map, untyped blocker list, patterns
    /// as a label → regex map.
    #[serde(rename = "v1")]
    V1(LegacyPackV1),
    /// Current unified layout, mirroring [`KnowledgePack`] directly.
    #[serde(rename = "v2")]
    V2(KnowledgePack),
}

/// The v1 flat shape as shipped by older pack authors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPackV1 {
    pub taxonomy: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub ignore_terms: Vec<String>,
    #[serde(default)]
    pub diagnostic_terms: Vec<String>,
    /// Variant patterns as label → regex.
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,
    pub weights: WeightConfig,
    #[serde(default)]
    pub stop_words: Vec<String>,
}

/// Adapt a v1 pack into the canonical layout. Legacy aliases carry no
/// tags, strength or category; legacy packs have no fast-path data.
pub fn from_legacy_v1(legacy: LegacyPackV1) -> KnowledgePack {
    let aliases = legacy
        .aliases
        .into_iter()
        .map(|(canonical, variants)| AliasEntry {
            canonical,
            variants,
            tags: Vec::new(),
            strong: false,
            category: None,
        })
        .collect();

    let variant_patterns = legacy
        .patterns
        .into_iter()
        .map(|(label, pattern)| PatternSpec { label, pattern })
        .collect();

    KnowledgePack {
        taxonomy: Taxonomy {
            categories: legacy.taxonomy,
        },
        aliases,
        negatives: NegativeRules {
            hard_blockers: legacy.blockers,
            blocker_patterns: Vec::new(),
            soft_demotions: legacy.ignore_terms,
            diagnostic_terms: legacy.diagnostic_terms,
            conditional_includes: Vec::new(),
        },
        weights: legacy.weights,
        variant_patterns,
        domain_codes: BTreeMap::new(),
        brands: BTreeMap::new(),
        context_boosts: Vec::new(),
        stop_words: legacy.stop_words,
    }
}

/// Parse and validate a pack from its JSON payload.
///
/// Fails with [`EngineError::InvalidPack`] for an unrecognized schema
/// tag, missing required sections or malformed threshold values.
pub fn load_pack(json: &str) -> EngineResult<KnowledgePack> {
    let versioned: VersionedPack = serde_json::from_str(json)
        .map_err(|err| EngineError::InvalidPack(format!("unrecognized pack payload: {err}")))?;

    let pack = match versioned {
        VersionedPack::V1(legacy) => from_legacy_v1(legacy),
        VersionedPack::V2(pack) => pack,
    };

    pack.validate()?;
    Ok(pack)
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
