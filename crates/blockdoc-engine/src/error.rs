use uuid::Uuid;

use crate::editing::element::Path;

/// Error taxonomy for the document engine.
///
/// Primitive-level errors (`PathNotFound`, `InvariantViolation`) are caught
/// at the operation boundary and converted into a rolled-back operation; the
/// live document is never left half-mutated.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A referenced path no longer exists, typically because the caller kept
    /// a path across a mutation instead of re-resolving by node id.
    #[error("no element exists at path {path}")]
    PathNotFound { path: Path },
    /// The operation targets a block id that is not in the store.
    #[error("block {id} does not exist")]
    BlockNotFound { id: Uuid },
    /// A primitive mutation would produce a tree that normalization cannot
    /// repair (empty required container, stray top-level leaf, ...).
    #[error("structural invariant violated: {reason}")]
    InvariantViolation { reason: String },
    /// A normalization rule or block validator failed; the triggering batch
    /// has been rolled back.
    #[error("normalization of block type `{kind}` failed")]
    Normalization {
        kind: String,
        #[source]
        source: anyhow::Error,
    },
    /// A loaded or merged snapshot failed structural validation.
    #[error("invalid document snapshot: {reason}")]
    InvalidDocument { reason: String },
}

impl EngineError {
    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_document(reason: impl Into<String>) -> Self {
        EngineError::InvalidDocument {
            reason: reason.into(),
        }
    }
}
