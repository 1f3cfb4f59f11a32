//! Engine error types for ferry-engine.

use ferry_core::{CoreError, StoreRole};
use ferry_store::StoreError;
use thiserror::Error;

/// Errors from coordination, reconciliation, and session orchestration.
///
/// Single-record store faults are not errors here; they surface as failed
/// outcomes and unknown existence. Only malformed input, key enumeration,
/// connection setup or loss, and artifact I/O produce an `EngineError`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input or an invalid lifecycle transition.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Store connection or key enumeration failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An established store connection went away mid-session.
    #[error("{0} store connection lost mid-session")]
    ConnectionLost(StoreRole),

    /// Outcome journal could not be written or read.
    #[error("Journal error at {path}: {reason}")]
    Journal { path: String, reason: String },

    /// Report or journal directory I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
