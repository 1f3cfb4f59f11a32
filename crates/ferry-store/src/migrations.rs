//! Schema provisioning for libSQL stores.
//!
//! Migration files are embedded at compile time and use `IF NOT EXISTS`, so
//! re-running them against a provisioned database is a no-op.

use crate::error::StoreError;
use crate::libsql_store::LibSqlStore;

/// The `records` table: one row per key with four text fields.
const MIGRATION_001: &str = include_str!("../migrations/001_records.sql");

impl LibSqlStore {
    /// Run all embedded migrations in sequence.
    pub(crate) async fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn()
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| StoreError::Migration(format!("001_records: {e}")))?;
        Ok(())
    }
}
