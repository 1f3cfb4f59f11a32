//! # ferry-engine
//!
//! Dual-write coordination and reconciliation for live store migrations.
//!
//! - [`WriteCoordinator`]: one logical write, applied to origin then target
//! - [`ConsistencyChecker`]: one key, read from both stores and compared
//! - [`ReconciliationEngine`]: sample or full-keyspace batches of checks
//! - [`report`]: the plain-text reconciliation report
//! - [`MigrationSession`]: the state machine tying it together
//! - [`backfill()`]: copy pre-existing origin records into the target
//!
//! Single-record faults never abort a run. They show up as failed write
//! outcomes, unknown existence, and error counts in [`MigrationMetrics`].

pub mod backfill;
pub mod checker;
pub mod coordinator;
pub mod error;
pub mod journal;
pub mod metrics;
pub mod reconcile;
pub mod report;
pub mod session;

pub use backfill::{BackfillOptions, BackfillStats, backfill};
pub use checker::ConsistencyChecker;
pub use coordinator::{DualWriteResult, TargetWrite, WriteCoordinator};
pub use error::EngineError;
pub use journal::{JournalEntry, OutcomeJournal};
pub use metrics::MigrationMetrics;
pub use reconcile::{Reconciliation, ReconciliationEngine};
pub use report::{generate_report, report_file_name, write_report};
pub use session::{
    MigrationSession, SessionPlan, SessionReport, Validation, WriteTally, evaluate_success,
    new_session_id, run_session,
};
