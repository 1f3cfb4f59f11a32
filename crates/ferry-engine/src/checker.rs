//! Per-key consistency checks.

use std::sync::Arc;

use ferry_core::{ConsistencyResult, ReadOutcome, RecordKey};
use ferry_store::StoreClient;

use crate::metrics::MigrationMetrics;

/// Reported for the target side when the session has no target connection.
pub const TARGET_UNAVAILABLE: &str = "target unavailable";

/// Reads one key from both stores and compares the records.
///
/// Read-only, so any number of checks (including two for the same key) may
/// run concurrently.
#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    origin: StoreClient,
    target: Option<StoreClient>,
    metrics: Arc<MigrationMetrics>,
}

impl ConsistencyChecker {
    #[must_use]
    pub const fn new(
        origin: StoreClient,
        target: Option<StoreClient>,
        metrics: Arc<MigrationMetrics>,
    ) -> Self {
        Self {
            origin,
            target,
            metrics,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> &StoreClient {
        &self.origin
    }

    #[must_use]
    pub const fn target(&self) -> Option<&StoreClient> {
        self.target.as_ref()
    }

    /// Check one key.
    ///
    /// The two reads run concurrently with no ordering between them. A read
    /// that errors yields unknown existence, never "missing", and counts as
    /// an error. Without a target connection the target side is unknown.
    pub async fn check(&self, key: RecordKey) -> ConsistencyResult {
        let target_read = async {
            match &self.target {
                Some(target) => target.read(&key).await,
                None => ReadOutcome::Failed(TARGET_UNAVAILABLE.to_string()),
            }
        };
        let (origin, target) = tokio::join!(self.origin.read(&key), target_read);

        self.metrics.record_check();
        if matches!(origin, ReadOutcome::Failed(_)) {
            self.metrics.record_error();
        }
        if self.target.is_some() && matches!(target, ReadOutcome::Failed(_)) {
            self.metrics.record_error();
        }

        let result = ConsistencyResult::compare(key, &origin, &target);
        tracing::debug!(
            %key,
            class = ?result.classification(),
            differences = result.differences().len(),
            "consistency check"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use ferry_core::{ConsistencyClass, Existence, FieldDifference, Record, RecordFields, StoreRole};
    use ferry_store::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(key: RecordKey, name: &str) -> Record {
        Record::new(
            key,
            RecordFields {
                name: name.into(),
                email: "a@x.com".into(),
                gender: "Female".into(),
                address: "1 Rd".into(),
            },
        )
    }

    fn checker(
        origin: &Arc<MemoryStore>,
        target: &Arc<MemoryStore>,
    ) -> (ConsistencyChecker, Arc<MigrationMetrics>) {
        let metrics = Arc::new(MigrationMetrics::new());
        let checker = ConsistencyChecker::new(
            StoreClient::new(StoreRole::Origin, origin.clone()),
            Some(StoreClient::new(StoreRole::Target, target.clone())),
            Arc::clone(&metrics),
        );
        (checker, metrics)
    }

    #[tokio::test]
    async fn identical_records_match() {
        let key = RecordKey::generate();
        let origin = Arc::new(MemoryStore::with_records([record(key, "Ann")]));
        let target = Arc::new(MemoryStore::with_records([record(key, "Ann")]));
        let (checker, metrics) = checker(&origin, &target);

        let result = checker.check(key).await;
        assert!(result.fields_match());
        assert!(result.differences().is_empty());
        assert_eq!(metrics.consistency_checks(), 1);
    }

    #[tokio::test]
    async fn differing_name_is_reported() {
        let key = RecordKey::generate();
        let origin = Arc::new(MemoryStore::with_records([record(key, "Bob")]));
        let target = Arc::new(MemoryStore::with_records([record(key, "Bobby")]));
        let (checker, _) = checker(&origin, &target);

        let result = checker.check(key).await;
        assert!(!result.fields_match());
        assert_eq!(result.differences(), &[FieldDifference::new("name", "Bob", "Bobby")]);
    }

    #[tokio::test]
    async fn absent_everywhere_has_no_differences() {
        let origin = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let (checker, metrics) = checker(&origin, &target);

        let result = checker.check(RecordKey::generate()).await;
        assert!(!result.exists_in_origin());
        assert!(!result.exists_in_target());
        assert!(result.differences().is_empty());
        assert_eq!(metrics.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn read_fault_is_unknown_not_missing() {
        let key = RecordKey::generate();
        let origin = Arc::new(MemoryStore::with_records([record(key, "Ann")]));
        let target = Arc::new(MemoryStore::with_records([record(key, "Ann")]));
        target.fail_reads_for(key);
        let (checker, metrics) = checker(&origin, &target);

        let result = checker.check(key).await;
        assert_eq!(result.classification(), ConsistencyClass::ReadFailure);
        assert!(result.target().is_unknown());
        assert_eq!(result.origin(), &Existence::Exists);
        assert_eq!(metrics.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn check_is_idempotent() {
        let key = RecordKey::generate();
        let origin = Arc::new(MemoryStore::with_records([record(key, "Bob")]));
        let target = Arc::new(MemoryStore::with_records([record(key, "Bobby")]));
        let (checker, _) = checker(&origin, &target);

        assert_eq!(checker.check(key).await, checker.check(key).await);
    }

    #[tokio::test]
    async fn missing_target_connection_reads_as_unknown() {
        let key = RecordKey::generate();
        let origin = Arc::new(MemoryStore::with_records([record(key, "Ann")]));
        let metrics = Arc::new(MigrationMetrics::new());
        let checker = ConsistencyChecker::new(
            StoreClient::new(StoreRole::Origin, origin),
            None,
            Arc::clone(&metrics),
        );

        let result = checker.check(key).await;
        assert_eq!(
            result.target(),
            &Existence::Unknown {
                error: TARGET_UNAVAILABLE.to_string()
            }
        );
        assert_eq!(metrics.snapshot().errors, 0);
    }
}
