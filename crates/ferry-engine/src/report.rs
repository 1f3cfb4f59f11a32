//! Plain-text reconciliation report.
//!
//! The layout is consumed by downstream tooling and must stay stable:
//!
//! ```text
//! ================================================================================
//! DATA CONSISTENCY RECONCILIATION REPORT
//! ================================================================================
//! Generated: 2026-10-19 14:30:00 UTC
//! Scope: full
//! Validation Duration: 0.42 seconds
//!
//! SUMMARY STATISTICS:
//!   Total Records Validated: 20
//!   ...
//!
//! RECORDS MISSING IN ORIGIN:      (only when non-empty)
//! RECORDS MISSING IN TARGET:      (only when non-empty)
//! READ FAILURES:                  (only when non-empty)
//! DATA MISMATCHES:                (only when non-empty)
//!
//! RECOMMENDATION: proceed with caution
//! ================================================================================
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ferry_core::{
    ConsistencyClass, ConsistencyResult, Existence, Recommendation, RecommendationThresholds,
    ValidationSummary,
};

use crate::error::EngineError;

const RULE_WIDTH: usize = 80;

/// Render the report for one finalized reconciliation.
#[must_use]
pub fn generate_report(
    summary: &ValidationSummary,
    results: &[ConsistencyResult],
    thresholds: &RecommendationThresholds,
    generated_at: DateTime<Utc>,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Header
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "DATA CONSISTENCY RECONCILIATION REPORT");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Scope: {}", summary.scope);
    #[allow(clippy::cast_precision_loss)]
    let seconds = summary.elapsed_ms as f64 / 1000.0;
    let _ = writeln!(out, "Validation Duration: {seconds:.2} seconds");
    if summary.partial {
        let _ = writeln!(out, "Status: PARTIAL (run cancelled before every key was checked)");
    }
    out.push('\n');

    // Summary statistics
    let _ = writeln!(out, "SUMMARY STATISTICS:");
    let _ = writeln!(out, "  Total Records Validated: {}", summary.total_records);
    let _ = writeln!(out, "  Consistent Records: {}", summary.consistent_records);
    let _ = writeln!(out, "  Missing in Origin: {}", summary.missing_in_origin);
    let _ = writeln!(out, "  Missing in Target: {}", summary.missing_in_target);
    let _ = writeln!(out, "  Data Mismatches: {}", summary.data_mismatches);
    let _ = writeln!(out, "  Read Failures: {}", summary.read_failures);
    let _ = writeln!(out, "  Consistency Rate: {:.1}%", summary.consistency_rate);
    out.push('\n');

    let missing_in_origin = results.iter().filter(|r| {
        matches!(
            r.classification(),
            ConsistencyClass::MissingInOrigin | ConsistencyClass::MissingInBoth
        )
    });
    write_key_section(&mut out, "RECORDS MISSING IN ORIGIN:", missing_in_origin);

    let missing_in_target = results.iter().filter(|r| {
        matches!(
            r.classification(),
            ConsistencyClass::MissingInTarget | ConsistencyClass::MissingInBoth
        )
    });
    write_key_section(&mut out, "RECORDS MISSING IN TARGET:", missing_in_target);

    let failures: Vec<&ConsistencyResult> = results.iter().filter(|r| r.has_read_failure()).collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "READ FAILURES:");
        for result in failures {
            let _ = writeln!(out, "  - {}", result.key());
            for (side, existence) in [("origin", result.origin()), ("target", result.target())] {
                if let Existence::Unknown { error } = existence {
                    let _ = writeln!(out, "    {side}: {error}");
                }
            }
        }
        out.push('\n');
    }

    let mismatches: Vec<&ConsistencyResult> = results
        .iter()
        .filter(|r| r.classification() == ConsistencyClass::Mismatched)
        .collect();
    if !mismatches.is_empty() {
        let _ = writeln!(out, "DATA MISMATCHES:");
        for result in mismatches {
            let _ = writeln!(out, "  Record: {}", result.key());
            for diff in result.differences() {
                let _ = writeln!(
                    out,
                    "    - {}: origin='{}' vs target='{}'",
                    diff.field, diff.origin_value, diff.target_value
                );
            }
        }
        out.push('\n');
    }

    // Recommendation
    let recommendation = summary.recommendation(thresholds);
    let _ = writeln!(out, "RECOMMENDATION: {}", recommendation.banner());
    let _ = writeln!(out, "  {}", recommendation_detail(recommendation, thresholds));
    let _ = writeln!(out, "{rule}");
    out
}

fn write_key_section<'a>(
    out: &mut String,
    title: &str,
    results: impl Iterator<Item = &'a ConsistencyResult>,
) {
    let mut results = results.peekable();
    if results.peek().is_none() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for result in results {
        let _ = writeln!(out, "  - {}", result.key());
    }
    out.push('\n');
}

fn recommendation_detail(
    recommendation: Recommendation,
    thresholds: &RecommendationThresholds,
) -> String {
    match recommendation {
        Recommendation::Proceed => format!(
            "Consistency rate is at or above {:.0}%; safe to advance to the next migration phase.",
            thresholds.proceed
        ),
        Recommendation::ProceedWithCaution => format!(
            "Consistency rate is at or above {:.0}%; resolve the listed inconsistencies before advancing.",
            thresholds.caution
        ),
        Recommendation::DoNotProceed => format!(
            "Consistency rate is below {:.0}%; investigate and re-run validation before advancing.",
            thresholds.caution
        ),
    }
}

/// File name for a report generated at `at`.
#[must_use]
pub fn report_file_name(at: DateTime<Utc>) -> String {
    format!("consistency_report_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Write `report` into `dir` under a timestamp-derived name.
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns `EngineError::Io` if the directory or file cannot be written.
pub fn write_report(dir: &Path, report: &str, at: DateTime<Utc>) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(at));
    std::fs::write(&path, report)?;
    tracing::info!(path = %path.display(), "reconciliation report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use ferry_core::{ReadOutcome, Record, RecordFields, RecordKey, ValidationScope};
    use tempfile::TempDir;

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

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn file_name_is_timestamp_derived() {
        assert_eq!(report_file_name(at()), "consistency_report_20260304_050607.txt");
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let k_missing = RecordKey::generate();
        let k_mismatch = RecordKey::generate();
        let k_ok = RecordKey::generate();
        let results = vec![
            ConsistencyResult::compare(
                k_missing,
                &ReadOutcome::Found(record(k_missing, "Ann")),
                &ReadOutcome::NotFound,
            ),
            ConsistencyResult::compare(
                k_mismatch,
                &ReadOutcome::Found(record(k_mismatch, "Bob")),
                &ReadOutcome::Found(record(k_mismatch, "Bobby")),
            ),
            ConsistencyResult::compare(
                k_ok,
                &ReadOutcome::Found(record(k_ok, "Cy")),
                &ReadOutcome::Found(record(k_ok, "Cy")),
            ),
        ];
        let summary = ValidationSummary::from_results(
            ValidationScope::Full,
            &results,
            Duration::from_millis(1500),
            false,
        );
        let report = generate_report(&summary, &results, &RecommendationThresholds::default(), at());

        let order = [
            "DATA CONSISTENCY RECONCILIATION REPORT",
            "Generated: 2026-03-04 05:06:07 UTC",
            "Validation Duration: 1.50 seconds",
            "SUMMARY STATISTICS:",
            "Missing in Target: 1",
            "Data Mismatches: 1",
            "Consistency Rate: 33.3%",
            "RECORDS MISSING IN TARGET:",
            "DATA MISMATCHES:",
            "name: origin='Bob' vs target='Bobby'",
            "RECOMMENDATION: do not proceed, investigate",
        ];
        let mut cursor = 0;
        for needle in order {
            let found = report[cursor..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or out of order: {needle}"));
            cursor += found + needle.len();
        }
        assert!(report.contains(&format!("  - {k_missing}")));
        assert!(!report.contains("RECORDS MISSING IN ORIGIN:"));
        assert!(!report.contains("READ FAILURES:"));
        assert!(!report.contains("PARTIAL"));
    }

    #[test]
    fn read_failures_are_listed_separately() {
        let key = RecordKey::generate();
        let results = vec![ConsistencyResult::compare(
            key,
            &ReadOutcome::Found(record(key, "Ann")),
            &ReadOutcome::Failed("timeout".into()),
        )];
        let summary =
            ValidationSummary::from_results(ValidationScope::Sample, &results, Duration::ZERO, true);
        let report = generate_report(&summary, &results, &RecommendationThresholds::default(), at());

        assert!(report.contains("READ FAILURES:"));
        assert!(report.contains("    target: timeout"));
        assert!(!report.contains("RECORDS MISSING IN TARGET:"));
        assert!(report.contains("Status: PARTIAL"));
    }

    #[test]
    fn empty_summary_still_renders() {
        let summary = ValidationSummary::empty(ValidationScope::Sample);
        let report = generate_report(&summary, &[], &RecommendationThresholds::default(), at());
        assert!(report.contains("Total Records Validated: 0"));
        assert!(report.contains("Consistency Rate: 0.0%"));
        assert!(report.contains("RECOMMENDATION: do not proceed, investigate"));
    }

    #[test]
    fn write_report_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("reports");
        let path = write_report(&nested, "body", at()).unwrap();
        assert_eq!(path, nested.join("consistency_report_20260304_050607.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "body");
    }
}
