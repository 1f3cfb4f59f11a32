//! libSQL adapter.
//!
//! Talks to a local libSQL file (or `:memory:`) or a remote `libsql://`
//! database. One connection is opened per store and shared by all workers.

use async_trait::async_trait;
use ferry_config::StoreConfig;
use ferry_core::{Record, RecordKey, StoreRole};
use libsql::Builder;

use crate::RecordStore;
use crate::error::StoreError;
use crate::helpers::{key_from_row, record_from_row};

/// libSQL-backed record store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    remote: bool,
}

impl LibSqlStore {
    /// Open the store described by `config` and verify it answers queries.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotConfigured` when neither a path nor a remote
    /// url/token pair is set, or `StoreError` if opening, provisioning, or
    /// the probe query fails.
    pub async fn open(role: StoreRole, config: &StoreConfig) -> Result<Self, StoreError> {
        if !config.is_configured() {
            return Err(StoreError::NotConfigured(role));
        }

        let remote = config.is_remote();
        let db = if remote {
            Builder::new_remote(config.url.clone(), config.auth_token.clone())
                .build()
                .await?
        } else {
            Builder::new_local(&config.path).build().await?
        };
        let conn = db.connect()?;
        let store = Self { db, conn, remote };

        if config.provision_schema {
            store.run_migrations().await?;
        }
        let existing = store.count().await?;
        tracing::info!(
            %role,
            location = %config.display_location(),
            existing,
            "libSQL store connected"
        );
        Ok(store)
    }

    /// Open a private in-memory database with the schema in place.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the database cannot be created.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(StoreRole::Origin, &StoreConfig::local(":memory:")).await
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

#[async_trait]
impl RecordStore for LibSqlStore {
    fn backend(&self) -> &'static str {
        if self.remote { "libsql-remote" } else { "libsql" }
    }

    async fn write(&self, record: &Record) -> Result<(), StoreError> {
        let f = &record.fields;
        self.conn
            .execute(
                "INSERT INTO records (id, name, email, gender, address) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    gender = excluded.gender,
                    address = excluded.address",
                libsql::params![
                    record.key.to_string(),
                    f.name.as_str(),
                    f.email.as_str(),
                    f.gender.as_str(),
                    f.address.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn read(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, email, gender, address FROM records WHERE id = ?1",
                [key.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM records", ()).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Query("COUNT(*) returned no row".into()))?;
        let count = row.get::<i64>(0)?;
        u64::try_from(count).map_err(|_| StoreError::InvalidRow(format!("negative count {count}")))
    }

    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT id FROM records ORDER BY id", ())
            .await?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(key_from_row(&row, 0)?);
        }
        Ok(keys)
    }

    async fn close(&self) -> Result<(), StoreError> {
        tracing::debug!(backend = self.backend(), "closing libSQL store");
        Ok(())
    }
}
