//! Path-compressed prefix trie with approximate lookup.
//!
//! Serves the classifier's fuzzy fallback: when exact token retrieval
//! misses, the trie walks as deep as the query allows, then ranks the
//! completions under the deepest reachable node by normalized edit
//! similarity.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use strsim::normalized_levenshtein;

/// Minimum normalized Levenshtein similarity for a fuzzy completion.
const FUZZY_SIMILARITY_FLOOR: f64 = 0.6;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// Compressed edge label leading into this node.
    label: String,
    /// Children keyed by the first character of their label.
    children: BTreeMap<char, TrieNode>,
    /// Term ids whose key terminates at this node.
    term_ids: Vec<usize>,
}

/// Approximate completion produced by [`PrefixTrie::fuzzy_top_k`].
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit {
    pub term_id: usize,
    pub completion: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PrefixTrie {
    root: TrieNode,
    key_count: usize,
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Insert one key. Empty keys are ignored.
    pub fn insert(&mut self, key: &str, term_id: usize) {
        if key.is_empty() {
            return;
        }
        Self::insert_at(&mut self.root, key, term_id);
        self.key_count += 1;
    }

    fn insert_at(node: &mut TrieNode, key: &str, term_id: usize) {
        let Some(first) = key.chars().next() else {
            if !node.term_ids.contains(&term_id) {
                node.term_ids.push(term_id);
            }
            return;
        };

        match node.children.get_mut(&first) {
            None => {
                let mut child = TrieNode {
                    label: key.to_string(),
                    ..Default::default()
                };
                child.term_ids.push(term_id);
                node.children.insert(first, child);
            }
            Some(child) => {
                let shared = common_prefix_len(&child.label, key);
                if shared == child.label.len() {
                    Self::insert_at(child, &key[shared..], term_id);
                } else {
                    // Split the edge at the divergence point: the existing
                    // node keeps its subtree under the remainder of its
                    // old label, the split point becomes a fresh branch node.
                    let mut detached = std::mem::take(child);
                    let suffix = detached.label[shared..].to_string();
                    child.label = detached.label[..shared].to_string();
                    detached.label = suffix;
                    if let Some(suffix_first) = detached.label.chars().next() {
                        child.children.insert(suffix_first, detached);
                    }
                    Self::insert_at(child, &key[shared..], term_id);
                }
            }
        }
    }

    // ─── Prefix lookup ─────────────────────────────────────────────────

    /// All term ids under the given prefix, ascending. A prefix ending
    /// inside a compressed edge still matches everything below that edge.
    pub fn lookup_prefix(&self, prefix: &str) -> Vec<usize> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut ids = Vec::new();
        Self::collect_prefix(&self.root, prefix, &mut ids);
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn collect_prefix(node: &TrieNode, remaining: &str, ids: &mut Vec<usize>) {
        if remaining.is_empty() {
            Self::collect_subtree(node, ids);
            return;
        }
        let Some(first) = remaining.chars().next() else {
            return;
        };
        let Some(child) = node.children.get(&first) else {
            return;
        };

        let shared = common_prefix_len(&child.label, remaining);
        if shared == remaining.len() {
            // Prefix exhausted at or inside this edge.
            Self::collect_subtree(child, ids);
        } else if shared == child.label.len() {
            Self::collect_prefix(child, &remaining[shared..], ids);
        }
    }

    fn collect_subtree(node: &TrieNode, ids: &mut Vec<usize>) {
        ids.extend_from_slice(&node.term_ids);
        for child in node.children.values() {
            Self::collect_subtree(child, ids);
        }
    }

    // ─── Fuzzy lookup ──────────────────────────────────────────────────

    /// Approximate top-k: walk the query as deep as it matches, then back
    /// off toward the root until some completion clears the similarity
    /// floor. Requires at least one matched character; never falls back
    /// to the whole vocabulary.
    pub fn fuzzy_top_k(&self, query: &str, top_k: usize) -> Vec<FuzzyHit> {
        if query.is_empty() || top_k == 0 {
            return Vec::new();
        }

        // Greedy descent recording every node reached and the full text
        // spelled out along the way.
        let mut frames: Vec<(&TrieNode, String)> = Vec::new();
        let mut node = &self.root;
        let mut path = String::new();
        let mut remaining = query;

        loop {
            let Some(first) = remaining.chars().next() else {
                break;
            };
            let Some(child) = node.children.get(&first) else {
                break;
            };
            let shared = common_prefix_len(&child.label, remaining);
            path.push_str(&child.label);
            frames.push((child, path.clone()));
            if shared < child.label.len() {
                // Query ended or diverged inside this edge.
                break;
            }
            node = child;
            remaining = &remaining[shared..];
        }

        for (frame_node, frame_path) in frames.iter().rev() {
            let mut completions: Vec<(String, &[usize])> = Vec::new();
            Self::collect_completions(frame_node, frame_path, &mut completions);

            let mut hits: Vec<FuzzyHit> = Vec::new();
            for (completion, term_ids) in &completions {
                let similarity = normalized_levenshtein(query, completion);
                if similarity >= FUZZY_SIMILARITY_FLOOR {
                    for &term_id in *term_ids {
                        hits.push(FuzzyHit {
                            term_id,
                            completion: completion.clone(),
                            similarity: similarity as f32,
                        });
                    }
                }
            }

            if !hits.is_empty() {
                hits.sort_by(|a, b| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.completion.cmp(&b.completion))
                        .then_with(|| a.term_id.cmp(&b.term_id))
                });
                hits.truncate(top_k);
                return hits;
            }
        }

        Vec::new()
    }

    fn collect_completions<'a>(
        node: &'a TrieNode,
        path: &str,
        out: &mut Vec<(String, &'a [usize])>,
    ) {
        if !node.term_ids.is_empty() {
            out.push((path.to_string(), &node.term_ids));
        }
        for child in node.children.values() {
            let mut child_path = String::with_capacity(path.len() + child.label.len());
            child_path.push_str(path);
            child_path.push_str(&child.label);
            Self::collect_completions(child, &child_path, out);
        }
    }
}

/// Byte length of the longest common character prefix. Always lands on a
/// character boundary so slicing with it is safe for multibyte text.
fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    loop {
        match (a_chars.next(), b_chars.next()) {
            (Some(x), Some(y)) if x == y => len += x.len_utf8(),
            _ => break,
        }
    }
    len
}

#[cfg(test)]
#[path = "tests/trie_tests.rs"]
mod tests;
