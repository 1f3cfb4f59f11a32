//! Dual-write coordinator.
//!
//! Applies one logical write to origin and target under a [`WriteMode`].
//! Origin is always written first and decides whether the logical write
//! happened; a target-only write cannot occur because the target write is
//! only issued after the origin write succeeds.

use std::sync::{Arc, Mutex, PoisonError};

use ferry_core::{
    RecordKey, SkipReason, StoreRole, WriteMode, WriteOutcome, WriteRequest,
};
use ferry_store::StoreClient;
use tokio::task::JoinSet;

use crate::error::EngineError;
use crate::journal::OutcomeJournal;
use crate::metrics::MigrationMetrics;

/// Target side of a dual write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetWrite {
    /// The target outcome is known (written, failed, or skipped).
    Done(WriteOutcome),
    /// Handed to the background; collect with [`WriteCoordinator::settle_secondary`].
    Pending,
}

/// Both halves of one logical write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualWriteResult {
    pub key: RecordKey,
    pub mode: WriteMode,
    pub origin: WriteOutcome,
    pub target: TargetWrite,
}

impl DualWriteResult {
    /// Whether the logical write happened. Origin alone decides this.
    #[must_use]
    pub const fn committed(&self) -> bool {
        self.origin.succeeded
    }

    /// Overall success as seen by the caller.
    ///
    /// `SyncBoth` needs both stores. `AsyncSecondary` is gated by origin
    /// while the target write is pending. A skipped target is never success.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        match &self.target {
            TargetWrite::Done(target) => self.origin.succeeded && target.succeeded,
            TargetWrite::Pending => self.origin.succeeded,
        }
    }
}

/// Issues dual writes and tracks background target writes.
pub struct WriteCoordinator {
    origin: StoreClient,
    target: Option<StoreClient>,
    metrics: Arc<MigrationMetrics>,
    journal: Arc<OutcomeJournal>,
    pending: Mutex<JoinSet<WriteOutcome>>,
}

impl WriteCoordinator {
    /// `target` is `None` when the session runs degraded.
    #[must_use]
    pub fn new(
        origin: StoreClient,
        target: Option<StoreClient>,
        metrics: Arc<MigrationMetrics>,
        journal: Arc<OutcomeJournal>,
    ) -> Self {
        Self {
            origin,
            target,
            metrics,
            journal,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.target.is_none()
    }

    /// Apply `request` to both stores under `mode`.
    ///
    /// Must be called from within a tokio runtime when `mode` is
    /// `AsyncSecondary`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Core` for a malformed request; no store is
    /// touched in that case. Store faults are reported in the outcomes.
    pub async fn dual_write(
        &self,
        request: WriteRequest,
        mode: WriteMode,
    ) -> Result<DualWriteResult, EngineError> {
        let record = request.into_record()?;
        let key = record.key;

        let origin = self.origin.write(&record).await;
        self.observe(&origin);

        let target = if !origin.succeeded {
            let skipped = WriteOutcome::skipped(key, StoreRole::Target, SkipReason::OriginFailed);
            self.observe(&skipped);
            TargetWrite::Done(skipped)
        } else if let Some(target) = &self.target {
            match mode {
                WriteMode::SyncBoth => {
                    let outcome = target.write(&record).await;
                    self.observe(&outcome);
                    TargetWrite::Done(outcome)
                }
                WriteMode::AsyncSecondary => {
                    let target = target.clone();
                    let metrics = Arc::clone(&self.metrics);
                    let journal = Arc::clone(&self.journal);
                    self.pending_set().spawn(async move {
                        let outcome = target.write(&record).await;
                        metrics.record_write(&outcome);
                        journal.record(&outcome);
                        outcome
                    });
                    TargetWrite::Pending
                }
            }
        } else {
            let skipped =
                WriteOutcome::skipped(key, StoreRole::Target, SkipReason::TargetUnavailable);
            self.observe(&skipped);
            TargetWrite::Done(skipped)
        };

        let result = DualWriteResult {
            key,
            mode,
            origin,
            target,
        };
        tracing::debug!(%key, %mode, committed = result.committed(), succeeded = result.succeeded(), "dual write");
        Ok(result)
    }

    /// Number of background target writes not yet collected.
    #[must_use]
    pub fn pending_secondary(&self) -> usize {
        self.pending_set().len()
    }

    /// Wait for every background target write and return their outcomes.
    ///
    /// Outcomes arrive in completion order. A panicked task is logged and
    /// counted as an error.
    pub async fn settle_secondary(&self) -> Vec<WriteOutcome> {
        let mut set = std::mem::take(&mut *self.pending_set());
        let mut outcomes = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    tracing::error!(%error, "background target write task failed");
                    self.metrics.record_error();
                }
            }
        }
        if !outcomes.is_empty() {
            tracing::debug!(settled = outcomes.len(), "background target writes settled");
        }
        outcomes
    }

    fn observe(&self, outcome: &WriteOutcome) {
        self.metrics.record_write(outcome);
        self.journal.record(outcome);
    }

    fn pending_set(&self) -> std::sync::MutexGuard<'_, JoinSet<WriteOutcome>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
