//! Reconciliation report and success policy.

use ferry_core::RecommendationThresholds;
use serde::{Deserialize, Serialize};

fn default_output_dir() -> String {
    "reports".to_string()
}

const fn default_proceed_threshold() -> f64 {
    95.0
}

const fn default_caution_threshold() -> f64 {
    90.0
}

const fn default_success_threshold() -> f64 {
    90.0
}

const fn default_journal() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Directory receiving `consistency_report_*.txt` and outcome journals.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Consistency rate (percent) at or above which the banner says proceed.
    #[serde(default = "default_proceed_threshold")]
    pub proceed_threshold: f64,

    /// Consistency rate (percent) at or above which the banner says proceed with caution.
    #[serde(default = "default_caution_threshold")]
    pub caution_threshold: f64,

    /// Minimum consistency rate (percent) for a session to count as successful.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,

    /// Append every write outcome to a JSONL journal in `output_dir`.
    #[serde(default = "default_journal")]
    pub journal: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            proceed_threshold: default_proceed_threshold(),
            caution_threshold: default_caution_threshold(),
            success_threshold: default_success_threshold(),
            journal: default_journal(),
        }
    }
}

impl ReportConfig {
    #[must_use]
    pub const fn thresholds(&self) -> RecommendationThresholds {
        RecommendationThresholds {
            proceed: self.proceed_threshold,
            caution: self.caution_threshold,
        }
    }
}
