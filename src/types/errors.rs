use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Knowledge pack failed eager validation (missing sections, malformed thresholds).
    #[error("Invalid knowledge pack: {0}")]
    InvalidPack(String),
    /// A serialized index artifact is truncated or internally inconsistent.
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),
    /// An index operation was attempted before `finalize` (or after freeze).
    #[error("Index not ready: {0}")]
    IndexNotReady(String),
    /// Isolated per-item failure inside a batch; never aborts the batch.
    #[error("Item processing failed: {0}")]
    Item(String),
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
