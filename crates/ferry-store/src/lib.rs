//! # ferry-store
//!
//! Store clients for ferry.
//!
//! A [`RecordStore`] is the raw adapter contract: upsert, point read, count,
//! key listing, close. [`StoreClient`] wraps an adapter with its role and turns
//! adapter results into the outcome types the engine works with:
//! - writes become [`WriteOutcome`] (never an `Err`)
//! - reads become [`ReadOutcome`], keeping "not found" apart from "read failed"
//!
//! Adapters: [`LibSqlStore`] (local file, `:memory:`, or remote `libsql://`)
//! and [`MemoryStore`] (in-process, with fault injection).

pub mod error;
pub mod helpers;
mod libsql_store;
pub mod memory;
mod migrations;
pub mod retry;

pub use error::StoreError;
pub use libsql_store::LibSqlStore;
pub use memory::MemoryStore;
pub use retry::{RetryConfig, with_connect_retry};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use ferry_config::{StoreBackend, StoreConfig};
use ferry_core::{ReadOutcome, Record, RecordKey, StoreRole, WriteOutcome};

/// Adapter contract for one record store.
///
/// Writes are upserts keyed by [`RecordKey`] that replace every field. Reads
/// return `Ok(None)` for an absent key and `Err` only when the read itself
/// could not be performed. Implementations must be safe to call concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and status output.
    fn backend(&self) -> &'static str;

    async fn write(&self, record: &Record) -> Result<(), StoreError>;

    async fn read(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Every key currently stored, in ascending order.
    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError>;

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StoreClient
// ---------------------------------------------------------------------------

/// A connected store together with the role it plays.
///
/// Cheap to clone; clones share the underlying adapter and the
/// connection-lost flag.
#[derive(Clone)]
pub struct StoreClient {
    role: StoreRole,
    store: Arc<dyn RecordStore>,
    lost: Arc<AtomicBool>,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("role", &self.role)
            .field("backend", &self.store.backend())
            .field("connection_lost", &self.connection_lost())
            .finish()
    }
}

impl StoreClient {
    #[must_use]
    pub fn new(role: StoreRole, store: Arc<dyn RecordStore>) -> Self {
        Self {
            role,
            store,
            lost: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub const fn role(&self) -> StoreRole {
        self.role
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Upsert one record and report how it went.
    pub async fn write(&self, record: &Record) -> WriteOutcome {
        let started = Instant::now();
        match self.store.write(record).await {
            Ok(()) => WriteOutcome::succeeded(record.key, self.role, started.elapsed()),
            Err(error) => {
                self.observe(&error);
                tracing::warn!(role = %self.role, key = %record.key, %error, "store write failed");
                WriteOutcome::failed(record.key, self.role, error.to_string(), started.elapsed())
            }
        }
    }

    /// Point read that never conflates a failed read with an absent key.
    pub async fn read(&self, key: &RecordKey) -> ReadOutcome {
        match self.store.read(key).await {
            Ok(Some(record)) => ReadOutcome::Found(record),
            Ok(None) => ReadOutcome::NotFound,
            Err(error) => {
                self.observe(&error);
                tracing::warn!(role = %self.role, %key, %error, "store read failed");
                ReadOutcome::Failed(error.to_string())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be queried.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count().await.inspect_err(|error| self.observe(error))
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be queried.
    pub async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        self.store.keys().await.inspect_err(|error| self.observe(error))
    }

    /// Whether any operation since connect failed with a connection-class
    /// error. Single-operation refusals do not set this.
    #[must_use]
    pub fn connection_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn observe(&self, error: &StoreError) {
        if error.is_connection() && !self.lost.swap(true, Ordering::SeqCst) {
            tracing::error!(role = %self.role, %error, "store connection lost");
        }
    }

    /// Release the connection. Errors are logged, not returned.
    pub async fn close(&self) {
        if let Err(error) = self.store.close().await {
            tracing::warn!(role = %self.role, %error, "store close failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Open the adapter selected by `config` once, without retry.
///
/// # Errors
///
/// Returns `StoreError` if the store is not configured or cannot be opened.
pub async fn open_store(
    role: StoreRole,
    config: &StoreConfig,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Libsql => Ok(Arc::new(LibSqlStore::open(role, config).await?)),
    }
}

/// Connect to a store with the bounded startup retry.
///
/// Each attempt opens the adapter and probes it with a count query.
///
/// # Errors
///
/// Returns `StoreError::Connection` after the retry budget is spent, or
/// `StoreError::NotConfigured` immediately when settings are missing.
pub async fn connect(
    role: StoreRole,
    config: &StoreConfig,
    retry: &RetryConfig,
) -> Result<StoreClient, StoreError> {
    connect_with(role, retry, || open_store(role, config)).await
}

/// Like [`connect`], with a caller-supplied opener.
///
/// # Errors
///
/// Same as [`connect`].
pub async fn connect_with<F, Fut>(
    role: StoreRole,
    retry: &RetryConfig,
    mut open: F,
) -> Result<StoreClient, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn RecordStore>, StoreError>>,
{
    with_connect_retry(role, retry, || {
        let opened = open();
        async move {
            let store = opened.await?;
            store.count().await?;
            Ok(StoreClient::new(role, store))
        }
    })
    .await
}
