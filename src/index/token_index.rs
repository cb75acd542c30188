//! Inverted token index with TF-IDF ranking over the pack vocabulary.
//!
//! Build phase: `add_term` registers token→term-id postings with
//! normalized per-token frequencies. `finalize` computes IDF weights and
//! freezes the index; queries before finalize and additions after it are
//! rejected rather than answered wrong.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};

use serde::{Deserialize, Serialize};

use crate::text::{normalize, Tokenizer};
use crate::types::{EngineError, EngineResult};

/// Multiplicative boost for query tokens that hit a posting exactly
/// rather than via prefix extension.
const EXACT_TOKEN_BOOST: f32 = 1.5;

// ==================== ENTRIES ====================

/// Posting list for one vocabulary token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEntry {
    /// Sorted, deduplicated ids of terms containing this token.
    pub term_ids: Vec<usize>,
    /// Document frequency: number of distinct terms containing this token.
    pub frequency: usize,
    /// `ln(totalTerms / frequency)`, computed at finalize.
    pub idf: f32,
}

/// One vocabulary term with its precomputed token statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct TermEntry {
    pub id: usize,
    pub term: String,
    pub normalized_term: String,
    pub tokens: Vec<String>,
    /// Normalized term frequency per token (count / token total).
    pub tf: BTreeMap<String, f32>,
    /// Static base score multiplier carried from the pack.
    pub score: f32,
    pub category: Option<String>,
}

/// Ranked result from [`TokenIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub term_id: usize,
    pub score: f32,
}

// ==================== INDEX ====================

#[derive(Debug, Clone)]
pub struct TokenIndex {
    token_map: BTreeMap<String, TokenEntry>,
    term_map: BTreeMap<usize, TermEntry>,
    term_id_counter: usize,
    total_terms: usize,
    tokenizer: Tokenizer,
    finalized: bool,
}

impl TokenIndex {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            token_map: BTreeMap::new(),
            term_map: BTreeMap::new(),
            term_id_counter: 0,
            total_terms: 0,
            tokenizer,
            finalized: false,
        }
    }

    /// Register one vocabulary term. Returns its assigned id.
    pub fn add_term(
        &mut self,
        term: &str,
        score: f32,
        category: Option<String>,
    ) -> EngineResult<usize> {
        if self.finalized {
            return Err(EngineError::IndexNotReady(
                "cannot add terms to a finalized index".to_string(),
            ));
        }

        let tokens = self.tokenizer.tokenize(term);
        let id = self.term_id_counter;
        self.term_id_counter += 1;
        self.total_terms += 1;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for token in &tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        let token_total = tokens.len().max(1) as f32;
        let tf: BTreeMap<String, f32> = counts
            .iter()
            .map(|(token, count)| (token.clone(), *count as f32 / token_total))
            .collect();

        for token in counts.keys() {
            let entry = self
                .token_map
                .entry(token.clone())
                .or_insert_with(|| TokenEntry {
                    term_ids: Vec::new(),
                    frequency: 0,
                    idf: 0.0,
                });
            entry.term_ids.push(id);
        }

        self.term_map.insert(
            id,
            TermEntry {
                id,
                term: term.to_string(),
                normalized_term: normalize(term),
                tokens,
                tf,
                score,
                category,
            },
        );
        Ok(id)
    }

    /// Compute IDF weights and freeze the index for querying.
    pub fn finalize(&mut self) {
        let total = self.total_terms.max(1) as f32;
        for entry in self.token_map.values_mut() {
            entry.term_ids.sort_unstable();
            entry.term_ids.dedup();
            entry.frequency = entry.term_ids.len();
            entry.idf = (total / entry.frequency.max(1) as f32).ln();
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn term_count(&self) -> usize {
        self.total_terms
    }

    pub fn term(&self, id: usize) -> Option<&TermEntry> {
        self.term_map.get(&id)
    }

    fn ensure_finalized(&self, operation: &str) -> EngineResult<()> {
        if self.finalized {
            Ok(())
        } else {
            Err(EngineError::IndexNotReady(format!(
                "{operation} called before finalize"
            )))
        }
    }

    // ─── Queries ───────────────────────────────────────────────────────

    /// TF-IDF ranked search: accumulates `tf·idf` per candidate term
    /// across query tokens (exact posting hits boosted by
    /// [`EXACT_TOKEN_BOOST`], prefix extensions unboosted), multiplies by
    /// the term's static score, returns top-k by descending score with
    /// term-id ascending as the tie-break.
    pub fn search(&self, query: &str, top_k: usize) -> EngineResult<Vec<SearchHit>> {
        self.ensure_finalized("search")?;

        let query_tokens = self.tokenizer.tokenize(query);
        if query_tokens.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut accumulated: BTreeMap<usize, f32> = BTreeMap::new();
        for token in &query_tokens {
            if let Some(entry) = self.token_map.get(token.as_str()) {
                self.accumulate(entry, token, EXACT_TOKEN_BOOST, &mut accumulated);
            }

            // Index tokens strictly extending this query token.
            for (index_token, entry) in self
                .token_map
                .range::<str, _>((Excluded(token.as_str()), Unbounded))
                .take_while(|(candidate, _)| candidate.starts_with(token.as_str()))
            {
                self.accumulate(entry, index_token, 1.0, &mut accumulated);
            }
        }

        let mut hits: Vec<SearchHit> = accumulated
            .into_iter()
            .filter_map(|(term_id, raw)| {
                let term = self.term_map.get(&term_id)?;
                let score = raw * term.score;
                (score > 0.0).then_some(SearchHit { term_id, score })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.term_id.cmp(&b.term_id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    fn accumulate(
        &self,
        entry: &TokenEntry,
        index_token: &str,
        boost: f32,
        accumulated: &mut BTreeMap<usize, f32>,
    ) {
        for &term_id in &entry.term_ids {
            if let Some(term) = self.term_map.get(&term_id) {
                let tf = term.tf.get(index_token).copied().unwrap_or(0.0);
                *accumulated.entry(term_id).or_insert(0.0) += tf * entry.idf * boost;
            }
        }
    }

    /// Terms whose token set is a superset of the query's tokens
    /// (intersection of postings). Empty query yields no results.
    pub fn search_exact(&self, query: &str) -> EngineResult<Vec<usize>> {
        self.ensure_finalized("search_exact")?;

        let mut query_tokens = self.tokenizer.tokenize(query);
        query_tokens.sort_unstable();
        query_tokens.dedup();
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut result: Option<Vec<usize>> = None;
        for token in &query_tokens {
            let Some(entry) = self.token_map.get(token.as_str()) else {
                return Ok(Vec::new());
            };
            result = Some(match result {
                None => entry.term_ids.clone(),
                Some(current) => {
                    let posting: HashSet<usize> = entry.term_ids.iter().copied().collect();
                    current
                        .into_iter()
                        .filter(|id| posting.contains(id))
                        .collect()
                }
            });
        }
        Ok(result.unwrap_or_default())
    }

    /// Terms containing any query token (union of postings), ascending id.
    pub fn search_partial(&self, query: &str) -> EngineResult<Vec<usize>> {
        self.ensure_finalized("search_partial")?;

        let mut ids: Vec<usize> = Vec::new();
        for token in self.tokenizer.tokenize(query) {
            if let Some(entry) = self.token_map.get(token.as_str()) {
                ids.extend_from_slice(&entry.term_ids);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    // ─── Artifact ──────────────────────────────────────────────────────

    pub fn to_artifact(&self) -> TokenIndexArtifact {
        TokenIndexArtifact {
            token_map: self
                .token_map
                .iter()
                .map(|(token, entry)| TokenArtifactEntry {
                    token: token.clone(),
                    term_ids: entry.term_ids.clone(),
                    frequency: entry.frequency,
                    idf: entry.idf,
                })
                .collect(),
            term_map: self
                .term_map
                .values()
                .map(|term| TermArtifactEntry {
                    id: term.id,
                    term: term.term.clone(),
                    normalized_term: term.normalized_term.clone(),
                    tokens: term.tokens.clone(),
                    score: term.score,
                    category: term.category.clone(),
                    tf: term.tf.iter().map(|(t, f)| (t.clone(), *f)).collect(),
                })
                .collect(),
            term_id_counter: self.term_id_counter,
            total_terms: self.total_terms,
        }
    }

    /// Rebuild a finalized index from its artifact. Every posting must
    /// resolve to a term entry or the artifact is rejected as corrupt.
    pub fn from_artifact(
        artifact: TokenIndexArtifact,
        tokenizer: Tokenizer,
    ) -> EngineResult<Self> {
        let mut term_map = BTreeMap::new();
        for entry in artifact.term_map {
            let tf: BTreeMap<String, f32> = entry.tf.into_iter().collect();
            term_map.insert(
                entry.id,
                TermEntry {
                    id: entry.id,
                    term: entry.term,
                    normalized_term: entry.normalized_term,
                    tokens: entry.tokens,
                    tf,
                    score: entry.score,
                    category: entry.category,
                },
            );
        }

        let mut token_map = BTreeMap::new();
        for entry in artifact.token_map {
            for term_id in &entry.term_ids {
                if !term_map.contains_key(term_id) {
                    return Err(EngineError::CorruptArtifact(format!(
                        "token {:?} references missing term id {term_id}",
                        entry.token
                    )));
                }
            }
            token_map.insert(
                entry.token,
                TokenEntry {
                    term_ids: entry.term_ids,
                    frequency: entry.frequency,
                    idf: entry.idf,
                },
            );
        }

        Ok(Self {
            token_map,
            term_map,
            term_id_counter: artifact.term_id_counter,
            total_terms: artifact.total_terms,
            tokenizer,
            finalized: true,
        })
    }
}

// ==================== ARTIFACT SHAPE ====================

/// Flat persisted form of one posting list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenArtifactEntry {
    pub token: String,
    pub term_ids: Vec<usize>,
    pub frequency: usize,
    pub idf: f32,
}

/// Flat persisted form of one term entry. `tf` stays a pair list on the
/// wire to keep the JSON shape stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermArtifactEntry {
    pub id: usize,
    pub term: String,
    pub normalized_term: String,
    pub tokens: Vec<String>,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tf: Vec<(String, f32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIndexArtifact {
    pub token_map: Vec<TokenArtifactEntry>,
    pub term_map: Vec<TermArtifactEntry>,
    pub term_id_counter: usize,
    pub total_terms: usize,
}

#[cfg(test)]
#[path = "tests/token_index_tests.rs"]
mod tests;
