//! Bilingual catalog classification and deduplication engine.
//!
//! Raw catalog items flow through four stages: text normalization
//! (Arabic/English folding and tokenization), dedupe (fingerprint
//! grouping and variant consolidation), classification (a weighted
//! standard scorer or an index-backed fast-path cascade) and the
//! decision rule mapping scores onto accept/review/reject. The whole
//! pipeline is driven by a declarative [`KnowledgePack`] compiled into
//! a read-only [`CompiledPack`] shared across worker threads.

pub mod dedupe;
pub mod index;
pub mod knowledge;
pub mod matching;
pub mod pipeline;
pub mod scoring;
pub mod text;
pub mod types;

pub use knowledge::{CompiledPack, KnowledgePack};
pub use pipeline::{BatchOptions, BatchReport, BatchRun, ClassifierStrategy, Engine, ResultQuery};
pub use types::{
    CatalogItem, DecisionStatus, EngineError, EngineResult, Explanation, GroupedRecord,
    ProcessedItem, ScoredItem,
};
