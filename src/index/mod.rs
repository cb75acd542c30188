//! Retrieval structures compiled from the knowledge pack.
//!
//! All three structures share one lifecycle: populated during pack
//! compilation, frozen before the first query, read-only afterwards.
//! The bloom filter answers "definitely not in the vocabulary", the
//! token index ranks candidates by TF-IDF, and the trie serves
//! prefix/approximate lookups when exact tokens miss.

pub mod bloom;
pub mod token_index;
pub mod trie;

pub use bloom::BloomFilter;
pub use token_index::{SearchHit, TermEntry, TokenIndex, TokenIndexArtifact};
pub use trie::{FuzzyHit, PrefixTrie};
