//! Error types for the synchronization engine

use sheetsync_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`SyncError`]
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while planning or dispatching a synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// Document model error
    #[error(transparent)]
    Core(#[from] sheetsync_core::Error),

    /// Formula tokenizer error
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The document changed since the batch was computed
    #[error("Conflicting update: batch computed against revision {expected}, document is at {actual}")]
    ConflictingUpdate { expected: u64, actual: u64 },

    /// The session refused the batch for a reason other than a conflict
    #[error("Batch rejected: {0}")]
    Rejected(String),

    /// No template is attached to the classification
    #[error("No template for classification {0}")]
    TemplateNotFound(String),
}

impl SyncError {
    /// Whether retrying against a fresh snapshot may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::ConflictingUpdate { .. })
    }
}
