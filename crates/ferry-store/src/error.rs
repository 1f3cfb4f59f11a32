//! Store error types for ferry-store.

use ferry_core::StoreRole;
use thiserror::Error;

/// Errors from store adapters and connection setup.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached within the connect retry budget.
    #[error("{role} store unreachable after {attempts} attempt(s): {reason}")]
    Connection {
        role: StoreRole,
        attempts: u32,
        reason: String,
    },

    /// Required connection settings are missing.
    #[error("{0} store is not configured (set a path, or a url and auth_token)")]
    NotConfigured(StoreRole),

    /// A query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A row could not be turned into a record.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// The store refused one operation. The connection is still usable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The connection went away after it was established.
    #[error("Store disconnected: {0}")]
    Disconnected(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

impl StoreError {
    /// Whether this error means the store cannot be reached, either at
    /// connect time or because an established connection was lost.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::NotConfigured(_)
                | Self::Disconnected(_)
                | Self::LibSql(libsql::Error::ConnectionFailed(_))
        )
    }
}
