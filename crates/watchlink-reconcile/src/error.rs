//! Error types for the reconciliation engine

use thiserror::Error;

/// Errors that can occur while reconciling watch state
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The operation was cancelled before the persist step
    #[error("reconciliation cancelled before persisting")]
    Cancelled,

    /// Storage error from the playback state store
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
