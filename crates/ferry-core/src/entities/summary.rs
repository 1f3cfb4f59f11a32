use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{ConsistencyClass, ConsistencyResult};
use crate::enums::{Recommendation, RecommendationThresholds, ValidationScope};

/// Aggregate over one finalized set of consistency results.
///
/// Recomputed from scratch for every run; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationSummary {
    pub scope: ValidationScope,
    pub total_records: u64,
    pub consistent_records: u64,
    pub missing_in_origin: u64,
    pub missing_in_target: u64,
    pub data_mismatches: u64,
    /// Keys where at least one read errored (presence unknown).
    pub read_failures: u64,
    /// `100 * consistent / total`, or 0 when nothing was checked.
    pub consistency_rate: f64,
    pub elapsed_ms: u64,
    /// Set when the run was cancelled before every key was checked.
    pub partial: bool,
}

impl ValidationSummary {
    /// All-zero summary for runs that never reached reconciliation.
    #[must_use]
    pub const fn empty(scope: ValidationScope) -> Self {
        Self {
            scope,
            total_records: 0,
            consistent_records: 0,
            missing_in_origin: 0,
            missing_in_target: 0,
            data_mismatches: 0,
            read_failures: 0,
            consistency_rate: 0.0,
            elapsed_ms: 0,
            partial: false,
        }
    }

    /// Summarize a finalized results collection.
    ///
    /// A key absent from both stores counts toward both missing counters.
    /// Read failures are counted separately and never as missing.
    #[must_use]
    pub fn from_results(
        scope: ValidationScope,
        results: &[ConsistencyResult],
        elapsed: Duration,
        partial: bool,
    ) -> Self {
        let mut summary = Self::empty(scope);
        summary.partial = partial;
        summary.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        summary.total_records = results.len() as u64;

        for result in results {
            match result.classification() {
                ConsistencyClass::Consistent => summary.consistent_records += 1,
                ConsistencyClass::Mismatched => summary.data_mismatches += 1,
                ConsistencyClass::MissingInOrigin => summary.missing_in_origin += 1,
                ConsistencyClass::MissingInTarget => summary.missing_in_target += 1,
                ConsistencyClass::MissingInBoth => {
                    summary.missing_in_origin += 1;
                    summary.missing_in_target += 1;
                }
                ConsistencyClass::ReadFailure => summary.read_failures += 1,
            }
        }

        summary.consistency_rate =
            consistency_rate(summary.consistent_records, summary.total_records);
        summary
    }

    #[must_use]
    pub fn recommendation(&self, thresholds: &RecommendationThresholds) -> Recommendation {
        Recommendation::from_rate(self.consistency_rate, thresholds)
    }
}

/// Percentage of consistent records, 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn consistency_rate(consistent: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (consistent as f64 * 100.0) / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ReadOutcome, Record, RecordFields, RecordKey};

    fn found(key: RecordKey, name: &str) -> ReadOutcome {
        ReadOutcome::Found(Record::new(
            key,
            RecordFields {
                name: name.into(),
                email: "e@x.com".into(),
                gender: "Other".into(),
                address: "Somewhere".into(),
            },
        ))
    }

    fn consistent() -> ConsistencyResult {
        let key = RecordKey::generate();
        ConsistencyResult::compare(key, &found(key, "A"), &found(key, "A"))
    }

    fn mismatched() -> ConsistencyResult {
        let key = RecordKey::generate();
        ConsistencyResult::compare(key, &found(key, "A"), &found(key, "B"))
    }

    #[test]
    fn empty_results_have_zero_rate() {
        let summary =
            ValidationSummary::from_results(ValidationScope::Full, &[], Duration::ZERO, false);
        assert_eq!(summary.total_records, 0);
        assert!(summary.consistency_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn eighteen_of_twenty_is_exactly_ninety() {
        let mut results: Vec<_> = (0..18).map(|_| consistent()).collect();
        results.push(mismatched());
        results.push(mismatched());
        let summary =
            ValidationSummary::from_results(ValidationScope::Sample, &results, Duration::ZERO, false);
        assert_eq!(summary.consistency_rate, 90.0);
        assert_eq!(summary.data_mismatches, 2);
        assert_eq!(
            summary.recommendation(&RecommendationThresholds::default()),
            Recommendation::ProceedWithCaution
        );
    }

    #[test]
    fn every_bucket_is_counted() {
        let key_o = RecordKey::generate();
        let key_t = RecordKey::generate();
        let key_n = RecordKey::generate();
        let key_f = RecordKey::generate();
        let results = vec![
            consistent(),
            mismatched(),
            ConsistencyResult::compare(key_o, &found(key_o, "A"), &ReadOutcome::NotFound),
            ConsistencyResult::compare(key_t, &ReadOutcome::NotFound, &found(key_t, "A")),
            ConsistencyResult::compare(key_n, &ReadOutcome::NotFound, &ReadOutcome::NotFound),
            ConsistencyResult::compare(
                key_f,
                &ReadOutcome::Failed("boom".into()),
                &found(key_f, "A"),
            ),
        ];
        let summary = ValidationSummary::from_results(
            ValidationScope::Sample,
            &results,
            Duration::from_millis(1500),
            true,
        );
        assert_eq!(summary.total_records, 6);
        assert_eq!(summary.consistent_records, 1);
        assert_eq!(summary.data_mismatches, 1);
        assert_eq!(summary.missing_in_target, 2);
        assert_eq!(summary.missing_in_origin, 2);
        assert_eq!(summary.read_failures, 1);
        assert_eq!(summary.elapsed_ms, 1500);
        assert!(summary.partial);
    }

    #[test]
    fn rate_stays_within_bounds() {
        for total in 1..=50_u64 {
            for consistent in 0..=total {
                let rate = consistency_rate(consistent, total);
                assert!((0.0..=100.0).contains(&rate), "{consistent}/{total} -> {rate}");
            }
        }
    }
}
