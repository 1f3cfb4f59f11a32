//! Migration session orchestration.
//!
//! A session owns both store clients, the metrics, the outcome journal, and
//! the cancellation token for one run. Components get what they need passed
//! in at construction; nothing is global.
//!
//! ```text
//! connect ─► run_writes ─► reconcile ─► finish
//!   │            │             │
//!   └────────────┴─────────────┴──► fail   (connection loss, key listing)
//! ```
//!
//! Every connected path ends in a [`SessionReport`], including a failed
//! connect. A malformed plan is returned to the caller as an error before
//! any store is written.

use std::path::Path;
use std::sync::Arc;

use ferry_config::FerryConfig;
use ferry_core::{
    ConsistencyResult, CoreError, MetricsSnapshot, Recommendation, RecommendationThresholds,
    RecordKey, SessionState, StoreRole, ValidationScope, ValidationSummary, WriteMode,
    WriteRequest,
};
use ferry_store::{RetryConfig, StoreClient, connect};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::checker::ConsistencyChecker;
use crate::coordinator::{DualWriteResult, TargetWrite, WriteCoordinator};
use crate::error::EngineError;
use crate::journal::OutcomeJournal;
use crate::metrics::MigrationMetrics;
use crate::reconcile::{Reconciliation, ReconciliationEngine};

// ---------------------------------------------------------------------------
// Plan and report
// ---------------------------------------------------------------------------

/// Which keys a session reconciles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Exactly these keys, in this order.
    Keys(Vec<RecordKey>),
    /// Up to `n` keys drawn from the origin keyspace.
    Sample(usize),
    /// Up to `n` of the keys this session committed, in write order.
    Written(usize),
    /// The union of every key in either store.
    Full,
}

impl Validation {
    #[must_use]
    pub const fn scope(&self) -> ValidationScope {
        match self {
            Self::Full => ValidationScope::Full,
            Self::Keys(_) | Self::Sample(_) | Self::Written(_) => ValidationScope::Sample,
        }
    }
}

/// Everything [`MigrationSession::run`] does, in order.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub writes: Vec<WriteRequest>,
    pub mode: WriteMode,
    pub validation: Validation,
}

impl SessionPlan {
    /// Reject the plan if any write request is malformed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Core` naming the first bad request.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_requests(&self.writes)
    }
}

fn validate_requests(requests: &[WriteRequest]) -> Result<(), EngineError> {
    for (idx, request) in requests.iter().enumerate() {
        request.fields.validate().map_err(|e| match e {
            CoreError::Validation(reason) => {
                CoreError::Validation(format!("write request {idx}: {reason}"))
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Write counts for the session, from the caller's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct WriteTally {
    pub requested: u64,
    /// Origin accepted the write, so the logical write happened.
    pub committed: u64,
    /// Both stores accepted the write.
    pub dual_succeeded: u64,
    /// Target write skipped because the session has no target connection.
    pub target_unavailable: u64,
}

impl WriteTally {
    fn observe(&mut self, result: &DualWriteResult, target_succeeded: Option<bool>) {
        self.requested += 1;
        if result.committed() {
            self.committed += 1;
        }
        if let TargetWrite::Done(target) = &result.target
            && target.skipped == Some(ferry_core::SkipReason::TargetUnavailable)
        {
            self.target_unavailable += 1;
        }
        if result.committed() && target_succeeded.unwrap_or(false) {
            self.dual_succeeded += 1;
        }
    }
}

/// Final artifact of every session, successful or not.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SessionReport {
    pub session_id: String,
    pub state: SessionState,
    pub success: bool,
    /// Ran origin-only because the target could not be reached.
    pub degraded: bool,
    pub recommendation: Recommendation,
    pub summary: ValidationSummary,
    pub metrics: MetricsSnapshot,
    pub writes: WriteTally,
    pub results: Vec<ConsistencyResult>,
    /// Why the session failed or was cut short.
    pub failure: Option<String>,
}

impl SessionReport {
    /// Report for a session whose connections were never established.
    #[must_use]
    pub fn connection_failed(session_id: impl Into<String>, error: &EngineError) -> Self {
        Self {
            session_id: session_id.into(),
            state: SessionState::Failed,
            success: false,
            degraded: false,
            recommendation: Recommendation::DoNotProceed,
            summary: ValidationSummary::empty(ValidationScope::Sample),
            metrics: MetricsSnapshot::default(),
            writes: WriteTally::default(),
            results: Vec::new(),
            failure: Some(error.to_string()),
        }
    }
}

/// Success policy: the rate meets the threshold and at least one check ran.
///
/// A run with zero checks cannot pass, whatever its rate.
#[must_use]
pub fn evaluate_success(summary: &ValidationSummary, checks: u64, success_threshold: f64) -> bool {
    checks >= 1 && !summary.partial && summary.consistency_rate >= success_threshold
}

// ---------------------------------------------------------------------------
// MigrationSession
// ---------------------------------------------------------------------------

pub struct MigrationSession {
    id: String,
    state: SessionState,
    config: FerryConfig,
    origin: StoreClient,
    target: Option<StoreClient>,
    metrics: Arc<MigrationMetrics>,
    journal: Arc<OutcomeJournal>,
    coordinator: Arc<WriteCoordinator>,
    reconciler: ReconciliationEngine,
    cancel: CancellationToken,
    written: Vec<RecordKey>,
    /// Committed keys whose async target write has not been observed yet.
    awaiting_target: Vec<RecordKey>,
    tally: WriteTally,
    reconciliation: Option<Reconciliation>,
}

impl MigrationSession {
    /// Connect both stores with the bounded startup retry.
    ///
    /// When the target cannot be reached and `session.allow_degraded` is set,
    /// the session continues origin-only and flags every target outcome as
    /// unavailable. When `journal` is set, write outcomes are appended under
    /// `report.output_dir`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if origin cannot be reached, or target
    /// cannot be reached and degraded mode is off.
    pub async fn connect(config: &FerryConfig, journal: bool) -> Result<Self, EngineError> {
        Self::connect_as(new_session_id(), config, journal).await
    }

    /// [`Self::connect`] under a caller-chosen session id, so a failed
    /// connect can still be reported under that id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::connect`].
    pub async fn connect_as(
        id: String,
        config: &FerryConfig,
        journal: bool,
    ) -> Result<Self, EngineError> {
        tracing::info!(session = %id, state = %SessionState::Idle, "session starting");

        let retry = RetryConfig::new(config.session.connect_attempts, config.session.connect_backoff());
        let origin = connect(StoreRole::Origin, &config.origin, &retry).await?;

        let target = match connect(StoreRole::Target, &config.target, &retry).await {
            Ok(client) => Some(client),
            Err(error) if config.session.allow_degraded => {
                tracing::warn!(
                    session = %id,
                    %error,
                    "target unreachable; continuing in degraded mode, target writes will be skipped"
                );
                None
            }
            Err(error) => {
                origin.close().await;
                return Err(error.into());
            }
        };

        let journal = if journal {
            OutcomeJournal::new(Path::new(&config.report.output_dir), &id)?
        } else {
            OutcomeJournal::disabled()
        };

        Ok(Self::assemble(id, config.clone(), origin, target, journal))
    }

    /// Build a session around already-connected clients.
    #[must_use]
    pub fn from_clients(
        config: &FerryConfig,
        origin: StoreClient,
        target: Option<StoreClient>,
        journal: OutcomeJournal,
    ) -> Self {
        Self::assemble(new_session_id(), config.clone(), origin, target, journal)
    }

    fn assemble(
        id: String,
        config: FerryConfig,
        origin: StoreClient,
        target: Option<StoreClient>,
        journal: OutcomeJournal,
    ) -> Self {
        let metrics = Arc::new(MigrationMetrics::new());
        metrics.reset();
        let journal = Arc::new(journal);
        let cancel = CancellationToken::new();

        let coordinator = Arc::new(WriteCoordinator::new(
            origin.clone(),
            target.clone(),
            Arc::clone(&metrics),
            Arc::clone(&journal),
        ));
        let checker = ConsistencyChecker::new(origin.clone(), target.clone(), Arc::clone(&metrics));
        let reconciler =
            ReconciliationEngine::new(checker, config.session.concurrency, cancel.clone());

        let session = Self {
            id,
            state: SessionState::ConnectionsEstablished,
            config,
            origin,
            target,
            metrics,
            journal,
            coordinator,
            reconciler,
            cancel,
            written: Vec::new(),
            awaiting_target: Vec::new(),
            tally: WriteTally::default(),
            reconciliation: None,
        };
        tracing::info!(
            session = %session.id,
            origin = session.origin.backend(),
            target = session.target.as_ref().map_or("unavailable", StoreClient::backend),
            "store connections established"
        );
        session
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.target.is_none()
    }

    /// Token that cancels this session cooperatively.
    ///
    /// Cancelling stops new writes and checks from being issued; in-flight
    /// ones finish and the summary is marked partial.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Path of the outcome journal, when journaling is on.
    #[must_use]
    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.path()
    }

    /// Dual-write `requests` on a bounded worker pool, then settle.
    ///
    /// Every request is validated before the first write is issued. After
    /// the last write, background target writes are awaited and the
    /// configured settling delay elapses before this returns. Results are in
    /// request order; cancelled requests are absent.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Core` if any request is malformed (nothing is
    /// written) or the session is not in a state that allows writes, and
    /// `EngineError::ConnectionLost` if a store the session depends on went
    /// away during the writes.
    pub async fn run_writes(
        &mut self,
        requests: Vec<WriteRequest>,
        mode: WriteMode,
    ) -> Result<Vec<DualWriteResult>, EngineError> {
        validate_requests(&requests)?;
        if self.state != SessionState::WritesInProgress {
            self.transition(SessionState::WritesInProgress)?;
        }
        if self.is_degraded() {
            tracing::warn!(session = %self.id, "degraded mode: target writes will be skipped");
        }

        let total = requests.len();
        tracing::info!(session = %self.id, %mode, writes = total, "dual writes started");

        let semaphore = Arc::new(Semaphore::new(self.config.session.concurrency.max(1)));
        let mut set = JoinSet::new();
        let mut slots: Vec<Option<DualWriteResult>> = vec![None; total];

        for (idx, request) in requests.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let coordinator = Arc::clone(&self.coordinator);
            set.spawn(async move {
                let _permit = permit;
                (idx, coordinator.dual_write(request, mode).await)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(result))) => slots[idx] = Some(result),
                Ok((idx, Err(error))) => {
                    tracing::warn!(session = %self.id, idx, %error, "write rejected");
                }
                Err(error) => {
                    tracing::error!(session = %self.id, %error, "dual write task failed");
                    self.metrics.record_error();
                }
            }
        }

        let results: Vec<DualWriteResult> = slots.into_iter().flatten().collect();
        for result in &results {
            let target_succeeded = match &result.target {
                TargetWrite::Done(target) => Some(target.succeeded),
                TargetWrite::Pending => {
                    self.awaiting_target.push(result.key);
                    None
                }
            };
            self.tally.observe(result, target_succeeded);
            if result.committed() {
                self.written.push(result.key);
            }
        }
        self.settle_secondary().await;

        tracing::info!(
            session = %self.id,
            dispatched = results.len(),
            requested = total,
            committed = self.tally.committed,
            dual_succeeded = self.tally.dual_succeeded,
            "dual writes finished"
        );

        if let Some(error) = self.lost_connection() {
            return Err(error);
        }
        self.settle().await;
        Ok(results)
    }

    /// Await background target writes and count the ones that landed.
    async fn settle_secondary(&mut self) {
        for outcome in self.coordinator.settle_secondary().await {
            let Some(pos) = self.awaiting_target.iter().position(|key| *key == outcome.key) else {
                continue;
            };
            self.awaiting_target.swap_remove(pos);
            if outcome.succeeded {
                self.tally.dual_succeeded += 1;
            }
        }
    }

    /// The origin is always required; the target only without degraded mode.
    fn lost_connection(&self) -> Option<EngineError> {
        if self.origin.connection_lost() {
            return Some(EngineError::ConnectionLost(StoreRole::Origin));
        }
        match &self.target {
            Some(target) if target.connection_lost() => {
                if !self.config.session.allow_degraded {
                    return Some(EngineError::ConnectionLost(StoreRole::Target));
                }
                tracing::warn!(session = %self.id, "target connection lost; continuing degraded");
                None
            }
            _ => None,
        }
    }

    /// Sleep for the settling delay, unless cancelled first.
    async fn settle(&self) {
        let delay = self.config.session.settling_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!(session = %self.id, delay_ms = delay.as_millis(), "settling before reconciliation");
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }

    /// Run reconciliation and keep its result for [`Self::finish`].
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if keys cannot be listed,
    /// `EngineError::Core` if the session cannot enter reconciliation, or
    /// `EngineError::ConnectionLost` if a required store went away. The
    /// partial result is kept for the failure report in that last case.
    pub async fn reconcile(&mut self, validation: Validation) -> Result<&Reconciliation, EngineError> {
        self.transition(SessionState::Reconciling)?;

        let run = match validation {
            Validation::Keys(keys) => self.reconciler.validate_sample(&keys).await,
            Validation::Sample(n) => {
                let keys = self.reconciler.sample_keys(n).await?;
                self.reconciler.validate_sample(&keys).await
            }
            Validation::Written(n) => {
                let keys: Vec<RecordKey> = self.written.iter().copied().take(n).collect();
                self.reconciler.validate_sample(&keys).await
            }
            Validation::Full => self.reconciler.validate_full().await?,
        };
        let lost = self.lost_connection();
        let run = self.reconciliation.insert(run);
        match lost {
            Some(error) => Err(error),
            None => Ok(run),
        }
    }

    /// Evaluate success, close both stores, and produce the report.
    pub async fn finish(self) -> SessionReport {
        let next = if self.state == SessionState::Reconciling {
            SessionState::Completed
        } else {
            SessionState::Failed
        };
        let failure = match next {
            SessionState::Failed => Some(format!("session ended in state {} without reconciliation", self.state)),
            _ if self.cancel.is_cancelled() => Some("cancelled".to_string()),
            _ => None,
        };
        self.close(next, failure).await
    }

    /// Abort the session after a fatal error.
    pub async fn fail(self, error: &EngineError) -> SessionReport {
        tracing::error!(session = %self.id, state = %self.state, %error, "session failed");
        self.close(SessionState::Failed, Some(error.to_string())).await
    }

    async fn close(mut self, next: SessionState, failure: Option<String>) -> SessionReport {
        if let Err(error) = self.transition(next) {
            tracing::warn!(session = %self.id, %error, "forcing terminal state");
            self.state = next;
        }

        self.release().await;

        let metrics = self.metrics.snapshot();
        let thresholds = self.thresholds();
        let Reconciliation { summary, results } = self
            .reconciliation
            .take()
            .unwrap_or_else(|| Reconciliation::empty(ValidationScope::Sample));

        let success = next == SessionState::Completed
            && evaluate_success(&summary, metrics.consistency_checks, self.config.report.success_threshold);
        let recommendation = summary.recommendation(&thresholds);

        tracing::info!(
            session = %self.id,
            state = %self.state,
            success,
            rate = summary.consistency_rate,
            checks = metrics.consistency_checks,
            %recommendation,
            "session finished"
        );

        SessionReport {
            session_id: self.id,
            state: self.state,
            success,
            degraded: self.target.as_ref().is_none_or(StoreClient::connection_lost),
            recommendation,
            summary,
            metrics,
            writes: self.tally,
            results,
            failure,
        }
    }

    /// Writes (if any), settle, reconcile, finish. Runtime failures are
    /// folded into the report.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Core` for a malformed plan. Nothing is written,
    /// the session state is left as is, and both stores are closed.
    pub async fn run(mut self, plan: SessionPlan) -> Result<SessionReport, EngineError> {
        if let Err(error) = plan.validate() {
            tracing::warn!(session = %self.id, %error, "plan rejected");
            self.release().await;
            return Err(error);
        }
        if !plan.writes.is_empty()
            && let Err(error) = self.run_writes(plan.writes, plan.mode).await
        {
            return Ok(self.fail(&error).await);
        }
        let reconciled = self.reconcile(plan.validation).await.map(|_| ());
        Ok(match reconciled {
            Ok(()) => self.finish().await,
            Err(error) => self.fail(&error).await,
        })
    }

    /// Settle background target writes and close both stores.
    async fn release(&mut self) {
        self.settle_secondary().await;
        self.origin.close().await;
        if let Some(target) = &self.target {
            target.close().await;
        }
    }

    #[must_use]
    pub const fn thresholds(&self) -> RecommendationThresholds {
        self.config.report.thresholds()
    }

    fn transition(&mut self, next: SessionState) -> Result<(), EngineError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity: "session".to_string(),
                from: self.state.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        tracing::info!(session = %self.id, from = %self.state, to = %next, "session state");
        self.state = next;
        Ok(())
    }
}

/// Validate `plan`, connect, and run it, turning a failed connect into a
/// failed report.
///
/// # Errors
///
/// Returns `EngineError::Core` for a malformed plan, before connecting.
pub async fn run_session(
    config: &FerryConfig,
    plan: SessionPlan,
    journal: bool,
) -> Result<SessionReport, EngineError> {
    plan.validate()?;
    let id = new_session_id();
    match MigrationSession::connect_as(id.clone(), config, journal).await {
        Ok(session) => session.run(plan).await,
        Err(error) => {
            tracing::error!(session = %id, %error, "session could not connect");
            Ok(SessionReport::connection_failed(id, &error))
        }
    }
}

/// Fresh `ses-xxxxxxxx` session id.
#[must_use]
pub fn new_session_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("ses-{}", &id[..8])
}
