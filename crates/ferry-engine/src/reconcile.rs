//! Batch reconciliation over a key sample or the full keyspace.
//!
//! Checks run on a bounded worker pool (`Semaphore` + `JoinSet`). Results are
//! slotted back into input order, so the summary and report are stable no
//! matter which worker finishes first. Cancellation stops dispatch, waits for
//! in-flight checks, and marks the summary partial.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use ferry_core::{ConsistencyResult, RecordKey, ValidationScope, ValidationSummary};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::checker::ConsistencyChecker;
use crate::error::EngineError;

/// Finalized output of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub summary: ValidationSummary,
    pub results: Vec<ConsistencyResult>,
}

impl Reconciliation {
    /// An all-zero run, for sessions that never reached reconciliation.
    #[must_use]
    pub const fn empty(scope: ValidationScope) -> Self {
        Self {
            summary: ValidationSummary::empty(scope),
            results: Vec::new(),
        }
    }
}

pub struct ReconciliationEngine {
    checker: ConsistencyChecker,
    concurrency: usize,
    cancel: CancellationToken,
}

impl ReconciliationEngine {
    #[must_use]
    pub fn new(checker: ConsistencyChecker, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            checker,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    #[must_use]
    pub const fn checker(&self) -> &ConsistencyChecker {
        &self.checker
    }

    /// Check exactly `keys`, in the given order. Duplicates are checked twice.
    pub async fn validate_sample(&self, keys: &[RecordKey]) -> Reconciliation {
        self.run_checks(keys.to_vec(), ValidationScope::Sample).await
    }

    /// Check every key present in either store.
    ///
    /// Keys are the set union of origin and target (each key once), checked
    /// in ascending order. Without a target connection only origin keys are
    /// known.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if either store cannot list its keys.
    pub async fn validate_full(&self) -> Result<Reconciliation, EngineError> {
        let mut keys: BTreeSet<RecordKey> = self.checker.origin().keys().await?.into_iter().collect();
        let origin_count = keys.len();
        let mut target_count = 0;
        if let Some(target) = self.checker.target() {
            let target_keys = target.keys().await?;
            target_count = target_keys.len();
            keys.extend(target_keys);
        }
        tracing::info!(
            origin = origin_count,
            target = target_count,
            unique = keys.len(),
            "full validation keyspace"
        );
        Ok(self
            .run_checks(keys.into_iter().collect(), ValidationScope::Full)
            .await)
    }

    /// Draw up to `n` keys from the origin keyspace.
    ///
    /// Keys are random UUIDs, so the first `n` in key order are an unbiased
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if origin cannot list its keys.
    pub async fn sample_keys(&self, n: usize) -> Result<Vec<RecordKey>, EngineError> {
        let mut keys = self.checker.origin().keys().await?;
        keys.truncate(n);
        Ok(keys)
    }

    async fn run_checks(&self, keys: Vec<RecordKey>, scope: ValidationScope) -> Reconciliation {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        let mut slots: Vec<Option<ConsistencyResult>> = vec![None; keys.len()];
        let mut partial = false;

        tracing::info!(%scope, keys = keys.len(), concurrency = self.concurrency, "reconciliation started");

        for (idx, key) in keys.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    partial = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        partial = true;
                        break;
                    }
                },
            };
            let checker = self.checker.clone();
            set.spawn(async move {
                let _permit = permit;
                (idx, checker.check(key).await)
            });
        }

        if partial {
            tracing::warn!(dispatched = set.len(), "reconciliation cancelled; waiting for in-flight checks");
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(error) => {
                    tracing::error!(%error, "consistency check task failed");
                    partial = true;
                }
            }
        }

        let results: Vec<ConsistencyResult> = slots.into_iter().flatten().collect();
        let summary = ValidationSummary::from_results(scope, &results, started.elapsed(), partial);
        tracing::info!(
            %scope,
            total = summary.total_records,
            consistent = summary.consistent_records,
            rate = summary.consistency_rate,
            partial,
            "reconciliation finished"
        );
        Reconciliation { summary, results }
    }
}
