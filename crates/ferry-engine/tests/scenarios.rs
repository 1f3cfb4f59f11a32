//! End-to-end migration scenarios against in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ferry_config::FerryConfig;
use ferry_core::{
    CoreError, FieldDifference, Recommendation, RecommendationThresholds, Record, RecordFields,
    RecordKey, SessionState, StoreRole, WriteMode, WriteRequest,
};
use ferry_engine::{
    EngineError, MigrationSession, OutcomeJournal, SessionPlan, Validation, generate_report,
};
use ferry_store::{MemoryStore, RecordStore, StoreClient};
use pretty_assertions::assert_eq;

fn fields(name: &str, email: &str, gender: &str, address: &str) -> RecordFields {
    RecordFields {
        name: name.into(),
        email: email.into(),
        gender: gender.into(),
        address: address.into(),
    }
}

fn person(name: &str) -> RecordFields {
    fields(name, &format!("{}@example.com", name.to_lowercase()), "Female", "1 Rd")
}

fn config() -> FerryConfig {
    let mut config = FerryConfig::default();
    config.session.settling_delay_ms = 0;
    config.session.concurrency = 4;
    config
}

fn session_over(
    origin: &Arc<MemoryStore>,
    target: Option<&Arc<MemoryStore>>,
    config: &FerryConfig,
) -> MigrationSession {
    MigrationSession::from_clients(
        config,
        StoreClient::new(StoreRole::Origin, origin.clone()),
        target.map(|t| StoreClient::new(StoreRole::Target, t.clone())),
        OutcomeJournal::disabled(),
    )
}

#[tokio::test]
async fn sync_both_write_then_check_matches() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let mut session = session_over(&origin, Some(&target), &config());

    let k1 = RecordKey::generate();
    let request = WriteRequest::with_key(k1, fields("Ann", "a@x.com", "Female", "1 Rd"));
    let written = session.run_writes(vec![request], WriteMode::SyncBoth).await.unwrap();
    assert!(written[0].succeeded());

    let run = session.reconcile(Validation::Keys(vec![k1])).await.unwrap();
    assert!(run.results[0].fields_match());
    assert!(run.results[0].differences().is_empty());

    let report = session.finish().await;
    assert_eq!(report.state, SessionState::Completed);
    assert!(report.success);
    assert_eq!(report.recommendation, Recommendation::Proceed);
}

#[tokio::test]
async fn origin_only_record_is_missing_in_target() {
    let k2 = Record::new(RecordKey::generate(), person("Kay"));
    let origin = Arc::new(MemoryStore::with_records([k2.clone()]));
    let target = Arc::new(MemoryStore::new());
    let mut session = session_over(&origin, Some(&target), &config());

    let run = session.reconcile(Validation::Full).await.unwrap();
    assert_eq!(run.summary.missing_in_target, 1);
    assert_eq!(run.summary.missing_in_origin, 0);

    let text = generate_report(&run.summary, &run.results, &RecommendationThresholds::default(), Utc::now());
    let section = text.split("RECORDS MISSING IN TARGET:").nth(1).unwrap();
    assert!(section.contains(&k2.key.to_string()));
}

#[tokio::test]
async fn name_mismatch_is_one_difference() {
    let key = RecordKey::generate();
    let origin = Arc::new(MemoryStore::with_records([Record::new(key, person("Bob"))]));
    let mut in_target = person("Bob");
    in_target.name = "Bobby".into();
    let target = Arc::new(MemoryStore::with_records([Record::new(key, in_target)]));
    let mut session = session_over(&origin, Some(&target), &config());

    let run = session.reconcile(Validation::Full).await.unwrap();
    assert_eq!(
        run.results[0].differences(),
        &[FieldDifference::new("name", "Bob", "Bobby")]
    );
    assert_eq!(run.summary.data_mismatches, 1);

    let report = session.finish().await;
    assert_eq!(report.recommendation, Recommendation::DoNotProceed);
    assert!(!report.success);
}

#[tokio::test]
async fn eighteen_of_twenty_proceeds_with_caution() {
    let records: Vec<Record> = (0..20)
        .map(|i| Record::new(RecordKey::generate(), person(&format!("User{i}"))))
        .collect();
    let origin = Arc::new(MemoryStore::with_records(records.clone()));
    let target = Arc::new(MemoryStore::with_records(records.iter().skip(2).cloned()));
    let keys: Vec<RecordKey> = records.iter().map(|r| r.key).collect();
    let mut session = session_over(&origin, Some(&target), &config());

    let run = session.reconcile(Validation::Keys(keys)).await.unwrap();
    assert!((run.summary.consistency_rate - 90.0).abs() < f64::EPSILON);

    let report = session.finish().await;
    assert_eq!(report.recommendation, Recommendation::ProceedWithCaution);
    assert_eq!(report.metrics.consistency_checks, 20);
    // The default success threshold is 90%, inclusive.
    assert!(report.success);
}

#[tokio::test]
async fn full_validation_never_double_counts() {
    let shared: Vec<Record> = (0..4)
        .map(|i| Record::new(RecordKey::generate(), person(&format!("S{i}"))))
        .collect();
    let origin_only = Record::new(RecordKey::generate(), person("O"));
    let target_only = Record::new(RecordKey::generate(), person("T"));
    let origin = Arc::new(MemoryStore::with_records(shared.iter().cloned().chain([origin_only])));
    let target = Arc::new(MemoryStore::with_records(shared.iter().cloned().chain([target_only])));
    let mut session = session_over(&origin, Some(&target), &config());

    let run = session.reconcile(Validation::Full).await.unwrap();
    assert_eq!(run.summary.total_records, 6);
}

#[tokio::test]
async fn zero_checks_cannot_succeed() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let session = session_over(&origin, Some(&target), &config());

    let plan = SessionPlan {
        writes: Vec::new(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Full,
    };
    let report = session.run(plan).await.unwrap();
    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.summary.total_records, 0);
    assert!(!report.success);
}

#[tokio::test]
async fn run_writes_and_validates_written_sample() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let session = session_over(&origin, Some(&target), &config());

    let plan = SessionPlan {
        writes: (0..10).map(|i| WriteRequest::new(person(&format!("W{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(5),
    };
    let report = session.run(plan).await.unwrap();

    assert!(report.success, "{report:?}");
    assert_eq!(report.summary.total_records, 5);
    assert_eq!(report.writes.requested, 10);
    assert_eq!(report.writes.dual_succeeded, 10);
    assert_eq!(report.metrics.origin_writes, 10);
    assert_eq!(report.metrics.target_writes, 10);
    assert_eq!(report.metrics.total_writes(), 20);
    assert_eq!(origin.write_count(), 10);
}

#[tokio::test]
async fn async_secondary_settles_before_reconciliation() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    target.set_write_delay(Duration::from_millis(20));
    let session = session_over(&origin, Some(&target), &config());

    let plan = SessionPlan {
        writes: (0..6).map(|i| WriteRequest::new(person(&format!("A{i}")))).collect(),
        mode: WriteMode::AsyncSecondary,
        validation: Validation::Full,
    };
    let report = session.run(plan).await.unwrap();

    assert!(report.success);
    assert_eq!(report.summary.consistent_records, 6);
    assert_eq!(report.metrics.target_writes, 6);
    assert_eq!(report.writes.dual_succeeded, 6);
}

#[tokio::test]
async fn failed_target_writes_lower_the_rate() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    target.set_fail_writes(true);
    let session = session_over(&origin, Some(&target), &config());

    let plan = SessionPlan {
        writes: (0..4).map(|i| WriteRequest::new(person(&format!("F{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Full,
    };
    let report = session.run(plan).await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.summary.missing_in_target, 4);
    assert_eq!(report.metrics.errors, 4);
    assert_eq!(report.writes.committed, 4);
    assert_eq!(report.writes.dual_succeeded, 0);
    assert!(!report.success);
}

#[tokio::test]
async fn origin_read_outage_is_not_missing_data() {
    let records: Vec<Record> = (0..3)
        .map(|i| Record::new(RecordKey::generate(), person(&format!("R{i}"))))
        .collect();
    let keys: Vec<RecordKey> = records.iter().map(|r| r.key).collect();
    let origin = Arc::new(MemoryStore::with_records(records.clone()));
    let target = Arc::new(MemoryStore::with_records(records));
    origin.set_fail_reads(true);
    let mut session = session_over(&origin, Some(&target), &config());

    let run = session.reconcile(Validation::Keys(keys)).await.unwrap();
    assert_eq!(run.summary.read_failures, 3);
    assert_eq!(run.summary.missing_in_origin, 0);
    assert_eq!(run.summary.consistent_records, 0);

    let report = session.finish().await;
    assert_eq!(report.metrics.errors, 3);
    assert!(!report.success);
}

#[tokio::test]
async fn degraded_session_never_reports_false_success() {
    let origin = Arc::new(MemoryStore::new());
    let session = session_over(&origin, None, &config());
    assert!(session.is_degraded());

    let plan = SessionPlan {
        writes: (0..3).map(|i| WriteRequest::new(person(&format!("D{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(3),
    };
    let report = session.run(plan).await.unwrap();

    assert!(report.degraded);
    assert_eq!(report.writes.committed, 3);
    assert_eq!(report.writes.target_unavailable, 3);
    assert_eq!(report.summary.read_failures, 3);
    assert_eq!(report.summary.missing_in_target, 0);
    assert!(!report.success);
}

#[tokio::test]
async fn cancelled_session_keeps_partial_results() {
    let records: Vec<Record> = (0..8)
        .map(|i| Record::new(RecordKey::generate(), person(&format!("C{i}"))))
        .collect();
    let origin = Arc::new(MemoryStore::with_records(records.clone()));
    let target = Arc::new(MemoryStore::with_records(records));
    let mut session = session_over(&origin, Some(&target), &config());

    session.cancellation_token().cancel();
    let run = session.reconcile(Validation::Full).await.unwrap();
    assert!(run.summary.partial);

    let report = session.finish().await;
    assert_eq!(report.state, SessionState::Completed);
    assert!(report.summary.partial);
    assert_eq!(report.failure.as_deref(), Some("cancelled"));
    assert!(!report.success);
}

#[tokio::test]
async fn repeated_checks_are_identical() {
    let key = RecordKey::generate();
    let origin = Arc::new(MemoryStore::with_records([Record::new(key, person("Bob"))]));
    let target = Arc::new(MemoryStore::new());

    let mut first = session_over(&origin, Some(&target), &config());
    let mut second = session_over(&origin, Some(&target), &config());
    let a = first.reconcile(Validation::Keys(vec![key])).await.unwrap().results.clone();
    let b = second.reconcile(Validation::Keys(vec![key])).await.unwrap().results.clone();
    assert_eq!(a, b);
}

#[tokio::test]
async fn malformed_plan_is_returned_to_the_caller() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let session = session_over(&origin, Some(&target), &config());

    let plan = SessionPlan {
        writes: vec![WriteRequest::new(person("Ann")), WriteRequest::new(person(""))],
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(2),
    };
    let err = session.run(plan).await.unwrap_err();

    assert!(matches!(err, EngineError::Core(CoreError::Validation(_))), "{err:?}");
    assert!(err.to_string().contains("write request 1"));
    assert_eq!(origin.write_count(), 0);
    assert_eq!(target.write_count(), 0);
    assert!(origin.is_closed());
    assert!(target.is_closed());
}

#[tokio::test]
async fn losing_the_origin_mid_session_fails() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let session = session_over(&origin, Some(&target), &config());
    origin.close().await.unwrap();

    let plan = SessionPlan {
        writes: (0..5).map(|i| WriteRequest::new(person(&format!("L{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(5),
    };
    let report = session.run(plan).await.unwrap();

    assert_eq!(report.state, SessionState::Failed);
    assert!(!report.success);
    assert_eq!(report.writes.committed, 0);
    assert_eq!(target.write_count(), 0);
    let failure = report.failure.unwrap();
    assert!(failure.contains("origin store connection lost"), "{failure}");
}

#[tokio::test]
async fn losing_the_target_without_degraded_mode_fails() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let mut config = config();
    config.session.allow_degraded = false;
    let session = session_over(&origin, Some(&target), &config);
    target.close().await.unwrap();

    let plan = SessionPlan {
        writes: (0..3).map(|i| WriteRequest::new(person(&format!("T{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(3),
    };
    let report = session.run(plan).await.unwrap();

    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(report.writes.committed, 3);
    assert_eq!(report.writes.dual_succeeded, 0);
    assert!(report.failure.unwrap().contains("target store connection lost"));
}

#[tokio::test]
async fn losing_the_target_with_degraded_mode_completes_degraded() {
    let origin = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryStore::new());
    let session = session_over(&origin, Some(&target), &config());
    target.close().await.unwrap();

    let plan = SessionPlan {
        writes: (0..3).map(|i| WriteRequest::new(person(&format!("G{i}")))).collect(),
        mode: WriteMode::SyncBoth,
        validation: Validation::Written(3),
    };
    let report = session.run(plan).await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert!(report.degraded);
    assert_eq!(report.summary.read_failures, 3);
    assert!(!report.success);
}
