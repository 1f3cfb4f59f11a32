//! Copy pre-existing origin records that the target does not have yet.
//!
//! Dual writes only cover records written after the migration starts. A
//! backfill closes the gap for older records so full validation can reach
//! 100%. Records already in the target are never overwritten.

use std::collections::BTreeSet;

use ferry_core::{ReadOutcome, RecordKey};
use ferry_store::StoreClient;
use schemars::JsonSchema;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::metrics::MigrationMetrics;

/// Outcome counts for one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct BackfillStats {
    /// Keys found in origin.
    pub scanned: u64,
    /// Origin keys the target already had.
    pub already_present: u64,
    /// Origin keys absent from the target.
    pub missing: u64,
    /// Records written to the target. Always 0 on a dry run.
    pub copied: u64,
    /// Records that could not be read from origin or written to target.
    pub failed: u64,
    pub dry_run: bool,
    /// Set when cancellation stopped the run before every batch ran.
    pub partial: bool,
}

/// Backfill tuning.
#[derive(Debug, Clone, Copy)]
pub struct BackfillOptions {
    /// Records copied concurrently per batch.
    pub batch_size: usize,
    /// Count what would be copied without writing.
    pub dry_run: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            dry_run: false,
        }
    }
}

enum CopyResult {
    Copied,
    Vanished,
    Failed,
}

/// Copy every origin record missing in the target, batch by batch.
///
/// # Errors
///
/// Returns `EngineError::Store` if either store cannot list its keys.
pub async fn backfill(
    origin: &StoreClient,
    target: &StoreClient,
    options: BackfillOptions,
    metrics: &MigrationMetrics,
    cancel: &CancellationToken,
) -> Result<BackfillStats, EngineError> {
    let origin_keys = origin.keys().await?;
    let present: BTreeSet<RecordKey> = target.keys().await?.into_iter().collect();
    let missing: Vec<RecordKey> = origin_keys
        .iter()
        .filter(|key| !present.contains(key))
        .copied()
        .collect();

    let mut stats = BackfillStats {
        scanned: origin_keys.len() as u64,
        missing: missing.len() as u64,
        dry_run: options.dry_run,
        ..BackfillStats::default()
    };
    stats.already_present = stats.scanned - stats.missing;

    tracing::info!(
        scanned = stats.scanned,
        missing = stats.missing,
        dry_run = options.dry_run,
        "backfill planned"
    );
    if options.dry_run {
        return Ok(stats);
    }

    for (batch_no, batch) in missing.chunks(options.batch_size.max(1)).enumerate() {
        if cancel.is_cancelled() {
            stats.partial = true;
            tracing::warn!(batch = batch_no, "backfill cancelled");
            break;
        }

        let mut set = JoinSet::new();
        for key in batch.iter().copied() {
            let origin = origin.clone();
            let target = target.clone();
            set.spawn(async move {
                match origin.read(&key).await {
                    ReadOutcome::Found(record) => {
                        let outcome = target.write(&record).await;
                        let result = if outcome.succeeded {
                            CopyResult::Copied
                        } else {
                            CopyResult::Failed
                        };
                        (Some(outcome), result)
                    }
                    // Deleted from origin since the key listing.
                    ReadOutcome::NotFound => (None, CopyResult::Vanished),
                    ReadOutcome::Failed(_) => (None, CopyResult::Failed),
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            let (outcome, result) = match joined {
                Ok(done) => done,
                Err(error) => {
                    tracing::error!(%error, "backfill task failed");
                    (None, CopyResult::Failed)
                }
            };
            if let Some(outcome) = &outcome {
                metrics.record_write(outcome);
            }
            match result {
                CopyResult::Copied => stats.copied += 1,
                CopyResult::Vanished => {}
                CopyResult::Failed => stats.failed += 1,
            }
        }
        tracing::debug!(batch = batch_no, copied = stats.copied, failed = stats.failed, "backfill batch done");
    }

    tracing::info!(copied = stats.copied, failed = stats.failed, partial = stats.partial, "backfill finished");
    Ok(stats)
}
