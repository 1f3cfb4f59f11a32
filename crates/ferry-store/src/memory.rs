//! In-memory store with fault injection.
//!
//! Stands in for a real adapter behind the same [`RecordStore`] contract.
//! Faults can be switched on at runtime to exercise failed writes,
//! unreadable keys, and refused connections.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ferry_core::{Record, RecordFields, RecordKey};

use crate::RecordStore;
use crate::error::StoreError;

/// Process-local store backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<RecordKey, RecordFields>>,
    unreadable: Mutex<HashSet<RecordKey>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    closed: AtomicBool,
    write_delay_ms: AtomicU64,
    write_count: AtomicUsize,
    read_count: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records, bypassing counters and faults.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records();
            for record in records {
                map.insert(record.key, record.fields);
            }
        }
        store
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make reads of one key fail while others succeed.
    pub fn fail_reads_for(&self, key: RecordKey) {
        self.unreadable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
    }

    /// Delay every write, to simulate a slow secondary.
    pub fn set_write_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of write calls received, including failed ones.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Number of read calls received, including failed ones.
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Direct lookup for assertions, bypassing counters and faults.
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        self.records()
            .get(key)
            .map(|fields| Record::new(*key, fields.clone()))
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<RecordKey, RecordFields>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Disconnected("store is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn write(&self, record: &Record) -> Result<(), StoreError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.ensure_open()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write fault".into()));
        }
        self.records().insert(record.key, record.fields.clone());
        Ok(())
    }

    async fn read(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        let unreadable = self
            .unreadable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if unreadable || self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected read fault for {key}")));
        }
        Ok(self.get(key))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self.records().len() as u64)
    }

    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        self.ensure_open()?;
        Ok(self.records().keys().copied().collect())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
