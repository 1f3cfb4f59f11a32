//! Session-scoped counters.
//!
//! Every field is an atomic so workers can record concurrently without a
//! lock. Counters only grow; [`MigrationMetrics::reset`] is called once at
//! session start.

use std::sync::atomic::{AtomicU64, Ordering};

use ferry_core::{MetricsSnapshot, StoreLatency, StoreRole, WriteOutcome};

#[derive(Debug, Default)]
struct LatencyCounter {
    writes: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyCounter {
    fn record(&self, elapsed_ms: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.max_ms.fetch_max(elapsed_ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, StoreLatency) {
        let writes = self.writes.load(Ordering::Relaxed);
        let total = self.total_ms.load(Ordering::Relaxed);
        let latency = StoreLatency {
            average_ms: total.checked_div(writes).unwrap_or(0),
            max_ms: self.max_ms.load(Ordering::Relaxed),
        };
        (writes, latency)
    }

    fn reset(&self) {
        self.writes.store(0, Ordering::Relaxed);
        self.total_ms.store(0, Ordering::Relaxed);
        self.max_ms.store(0, Ordering::Relaxed);
    }
}

/// Write, check, and error counters for one migration session.
#[derive(Debug, Default)]
pub struct MigrationMetrics {
    origin: LatencyCounter,
    target: LatencyCounter,
    consistency_checks: AtomicU64,
    errors: AtomicU64,
}

impl MigrationMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one write outcome.
    ///
    /// Attempted writes increment their store's counter exactly once,
    /// whatever the result. Skipped writes were never attempted and are not
    /// counted. Failed attempts also count as errors.
    pub fn record_write(&self, outcome: &WriteOutcome) {
        if !outcome.was_attempted() {
            return;
        }
        match outcome.store {
            StoreRole::Origin => self.origin.record(outcome.elapsed_ms),
            StoreRole::Target => self.target.record(outcome.elapsed_ms),
        }
        if !outcome.succeeded {
            self.record_error();
        }
    }

    pub fn record_check(&self) {
        self.consistency_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn consistency_checks(&self) -> u64 {
        self.consistency_checks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (origin_writes, origin_latency) = self.origin.snapshot();
        let (target_writes, target_latency) = self.target.snapshot();
        MetricsSnapshot {
            origin_writes,
            target_writes,
            consistency_checks: self.consistency_checks(),
            errors: self.errors.load(Ordering::Relaxed),
            origin_latency,
            target_latency,
        }
    }

    /// Zero every counter. Only valid at session start.
    pub fn reset(&self) {
        self.origin.reset();
        self.target.reset();
        self.consistency_checks.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}
