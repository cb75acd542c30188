//! Pack compilation: turns a validated [`KnowledgePack`] into the
//! immutable index set every classification call reads.
//!
//! Compilation is a one-time batch step keyed by the pack's content
//! signature. It either completes fully or fails; a partially built
//! index set is never exposed.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::index::{BloomFilter, PrefixTrie, TokenIndex, TokenIndexArtifact};
use crate::knowledge::patterns::{compile_patterns, VariantPattern};
use crate::knowledge::{DomainCodeRule, KnowledgePack, WeightConfig};
use crate::text::{normalize, Tokenizer};
use crate::types::{EngineError, EngineResult};

// ==================== COMPILED TABLES ====================

/// One positive vocabulary term ready for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeTerm {
    /// Normalized term text fed to the hybrid matcher.
    pub term: String,
    /// Normalized canonical form when this term is a spelling variant.
    pub canonical: Option<String>,
    pub weight: f32,
    pub strong: bool,
    pub category: Option<String>,
}

/// Conditional include with all member terms normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledConditional {
    pub trigger: String,
    pub requires_any: Vec<String>,
    pub blocked_by: Vec<String>,
}

/// Normalized negative vocabulary consumed by gate evaluation.
#[derive(Debug, Clone, Default)]
pub struct GateTables {
    pub hard_blockers: Vec<String>,
    pub blocker_patterns: Vec<VariantPattern>,
    pub soft_demotions: Vec<String>,
    pub diagnostic_terms: Vec<String>,
    pub conditional_includes: Vec<CompiledConditional>,
}

/// Decision thresholds with category keys pre-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    pub accept_min_score: f32,
    pub review_lower_bound: f32,
    per_category: BTreeMap<String, f32>,
}

impl ThresholdTable {
    /// Accept threshold for a category, falling back to the global
    /// minimum when no override exists.
    pub fn for_category(&self, category: Option<&str>) -> f32 {
        category
            .map(normalize)
            .and_then(|key| self.per_category.get(&key).copied())
            .unwrap_or(self.accept_min_score)
    }
}

/// Co-occurrence boost with normalized keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContextBoost {
    pub keywords: Vec<String>,
    pub boost: f32,
}

// ==================== COMPILED PACK ====================

/// The full read-only index set classification runs against.
#[derive(Debug, Clone)]
pub struct CompiledPack {
    pub pack: KnowledgePack,
    /// Content hash of the canonical pack serialization; identical pack
    /// content always yields an identical signature.
    pub signature: String,
    pub built_at: DateTime<Utc>,
    pub tokenizer: Tokenizer,
    pub token_index: TokenIndex,
    /// Bloom filter over every distinct vocabulary token.
    pub vocabulary: BloomFilter,
    pub trie: PrefixTrie,
    pub gates: GateTables,
    pub variant_patterns: Vec<VariantPattern>,
    /// Positive vocabulary, sorted by normalized term.
    pub include_terms: Vec<IncludeTerm>,
    /// Normalized category → normalized taxonomy keywords.
    pub category_keywords: BTreeMap<String, Vec<String>>,
    pub thresholds: ThresholdTable,
    /// Longest-prefix-first external code rules.
    pub domain_codes: Vec<(String, DomainCodeRule)>,
    /// Normalized brand name → reputation boost.
    pub brands: BTreeMap<String, f32>,
    pub context_boosts: Vec<CompiledContextBoost>,
}

/// Seed for one vocabulary entry while merging taxonomy and aliases.
#[derive(Debug, Clone)]
struct VocabSeed {
    raw: String,
    canonical: Option<String>,
    weight: f32,
    strong: bool,
    category: Option<String>,
}

impl CompiledPack {
    pub fn compile(pack: KnowledgePack) -> EngineResult<Self> {
        pack.validate()?;
        let signature = pack_signature(&pack)?;
        let tokenizer = Tokenizer::with_stop_words(&pack.stop_words);

        // Positive vocabulary: taxonomy keywords seeded first, alias
        // entries override them with richer metadata.
        let mut vocab: BTreeMap<String, VocabSeed> = BTreeMap::new();
        for (category, keywords) in &pack.taxonomy.categories {
            for keyword in keywords {
                let key = normalize(keyword);
                if key.is_empty() {
                    continue;
                }
                vocab.entry(key).or_insert_with(|| VocabSeed {
                    raw: keyword.clone(),
                    canonical: None,
                    weight: pack.weights.default_include_weight,
                    strong: false,
                    category: Some(category.clone()),
                });
            }
        }
        for alias in &pack.aliases {
            let weight = alias_weight(&alias.tags, &pack.weights);
            let canonical_key = normalize(&alias.canonical);
            if canonical_key.is_empty() {
                continue;
            }
            merge_seed(
                &mut vocab,
                canonical_key.clone(),
                VocabSeed {
                    raw: alias.canonical.clone(),
                    canonical: None,
                    weight,
                    strong: alias.strong,
                    category: alias.category.clone(),
                },
            );
            for variant in &alias.variants {
                let key = normalize(variant);
                if key.is_empty() {
                    continue;
                }
                merge_seed(
                    &mut vocab,
                    key,
                    VocabSeed {
                        raw: variant.clone(),
                        canonical: Some(canonical_key.clone()),
                        weight,
                        strong: alias.strong,
                        category: alias.category.clone(),
                    },
                );
            }
        }

        // Retrieval structures, built fully before first use.
        let mut token_index = TokenIndex::new(tokenizer.clone());
        let mut trie = PrefixTrie::new();
        let mut vocab_tokens: BTreeSet<String> = BTreeSet::new();
        for seed in vocab.values() {
            let term_id = token_index.add_term(&seed.raw, seed.weight, seed.category.clone())?;
            for token in tokenizer.tokenize(&seed.raw) {
                trie.insert(&token, term_id);
                vocab_tokens.insert(token);
            }
        }
        token_index.finalize();

        let mut vocabulary = BloomFilter::with_capacity(
            vocab_tokens.len().max(1),
            pack.weights.fast_path.bloom_false_positive_rate,
        );
        for token in &vocab_tokens {
            vocabulary.insert(token);
        }

        let gates = GateTables {
            hard_blockers: normalize_terms(&pack.negatives.hard_blockers),
            blocker_patterns: compile_patterns(&pack.negatives.blocker_patterns),
            soft_demotions: normalize_terms(&pack.negatives.soft_demotions),
            diagnostic_terms: normalize_terms(&pack.negatives.diagnostic_terms),
            conditional_includes: pack
                .negatives
                .conditional_includes
                .iter()
                .map(|rule| CompiledConditional {
                    trigger: normalize(&rule.trigger),
                    requires_any: normalize_terms(&rule.requires_any),
                    blocked_by: normalize_terms(&rule.blocked_by),
                })
                .collect(),
        };

        let include_terms = vocab
            .iter()
            .map(|(term, seed)| IncludeTerm {
                term: term.clone(),
                canonical: seed.canonical.clone(),
                weight: seed.weight,
                strong: seed.strong,
                category: seed.category.clone(),
            })
            .collect();

        let category_keywords = pack
            .taxonomy
            .categories
            .iter()
            .map(|(category, keywords)| (normalize(category), normalize_terms(keywords)))
            .collect();

        let thresholds = ThresholdTable {
            accept_min_score: pack.weights.accept_min_score,
            review_lower_bound: pack.weights.review_lower_bound,
            per_category: pack
                .weights
                .category_thresholds
                .iter()
                .map(|(category, threshold)| (normalize(category), *threshold))
                .collect(),
        };

        // Longest prefix first so the most specific rule wins.
        let mut domain_codes: Vec<(String, DomainCodeRule)> = pack
            .domain_codes
            .iter()
            .map(|(prefix, rule)| (prefix.trim().to_string(), rule.clone()))
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        domain_codes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let brands = pack
            .brands
            .iter()
            .filter_map(|(brand, boost)| {
                let key = normalize(brand);
                (!key.is_empty()).then_some((key, *boost))
            })
            .collect();

        let context_boosts = pack
            .context_boosts
            .iter()
            .map(|boost| CompiledContextBoost {
                keywords: normalize_terms(&boost.keywords),
                boost: boost.boost,
            })
            .filter(|boost| !boost.keywords.is_empty())
            .collect();

        let variant_patterns = compile_patterns(&pack.variant_patterns);

        Ok(Self {
            pack,
            signature,
            built_at: Utc::now(),
            tokenizer,
            token_index,
            vocabulary,
            trie,
            gates,
            variant_patterns,
            include_terms,
            category_keywords,
            thresholds,
            domain_codes,
            brands,
            context_boosts,
        })
    }

    /// Longest matching domain-code prefix rule, if any.
    pub fn domain_code_rule(&self, code: &str) -> Option<&DomainCodeRule> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.domain_codes
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix.as_str()))
            .map(|(_, rule)| rule)
    }

    // ─── Persisted artifacts ───────────────────────────────────────────

    pub fn bloom_bytes(&self) -> Vec<u8> {
        self.vocabulary.to_bytes()
    }

    pub fn token_index_artifact(&self) -> TokenIndexArtifact {
        self.token_index.to_artifact()
    }
}

/// Content signature: blake3 over the canonical JSON serialization.
pub fn pack_signature(pack: &KnowledgePack) -> EngineResult<String> {
    let canonical = serde_json::to_vec(pack)
        .map_err(|err| EngineError::InvalidPack(format!("pack not serializable: {err}")))?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

fn alias_weight(tags: &[String], weights: &WeightConfig) -> f32 {
    tags.iter()
        .filter_map(|tag| weights.tag_weights.get(tag).copied())
        .fold(None, |best: Option<f32>, weight| {
            Some(best.map_or(weight, |current| current.max(weight)))
        })
        .unwrap_or(weights.default_include_weight)
}

/// Collision rule for vocabulary seeds sharing one normalized text:
/// canonical identity always beats a variant spelling of another term;
/// between seeds of the same kind the heavier weight wins. Strength is
/// sticky either way.
fn merge_seed(vocab: &mut BTreeMap<String, VocabSeed>, key: String, seed: VocabSeed) {
    match vocab.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(seed);
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            let existing_is_canonical = existing.canonical.is_none();
            let seed_is_canonical = seed.canonical.is_none();
            let strong = existing.strong || seed.strong;

            if (seed_is_canonical && !existing_is_canonical)
                || (existing_is_canonical == seed_is_canonical && seed.weight > existing.weight)
            {
                *existing = seed;
            }
            existing.strong = strong;
        }
    }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|term| normalize(term))
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "tests/compiler_tests.rs"]
mod tests;
