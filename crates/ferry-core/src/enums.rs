//! Store roles, write modes, lifecycle states, and recommendation policy.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `SessionState` provides `allowed_next_states()` to enforce valid
//! transitions at the application layer.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// StoreRole
// ---------------------------------------------------------------------------

/// Which side of the migration a store plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreRole {
    /// Serves production traffic; authoritative for "did the write happen".
    Origin,
    /// Being populated during the migration.
    Target,
}

impl StoreRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WriteMode
// ---------------------------------------------------------------------------

/// Policy for applying one logical write to both stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Origin then target, sequentially. Target is skipped if origin fails.
    #[default]
    SyncBoth,
    /// Origin gates the caller; the target write runs in the background.
    AsyncSecondary,
}

impl WriteMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyncBoth => "sync_both",
            Self::AsyncSecondary => "async_secondary",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sync_both" => Ok(Self::SyncBoth),
            "async_secondary" => Ok(Self::AsyncSecondary),
            other => Err(CoreError::Validation(format!(
                "unknown write mode '{other}' (expected sync_both or async_secondary)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationScope
// ---------------------------------------------------------------------------

/// Which keys a reconciliation run covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScope {
    /// An explicit, caller-ordered list of keys.
    Sample,
    /// The union of every key in either store.
    Full,
}

impl ValidationScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ValidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of a migration session.
///
/// ```text
/// idle → connections_established → writes_in_progress → reconciling → completed
///                                → reconciling
///   (any non-terminal state) → failed
/// ```
///
/// Validation-only runs skip `writes_in_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    ConnectionsEstablished,
    WritesInProgress,
    Reconciling,
    Completed,
    Failed,
}

impl SessionState {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::ConnectionsEstablished, Self::Failed],
            Self::ConnectionsEstablished => {
                &[Self::WritesInProgress, Self::Reconciling, Self::Failed]
            }
            Self::WritesInProgress => &[Self::Reconciling, Self::Failed],
            Self::Reconciling => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ConnectionsEstablished => "connections_established",
            Self::WritesInProgress => "writes_in_progress",
            Self::Reconciling => "reconciling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Cut-over policy derived from a consistency rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationThresholds {
    /// Minimum rate (percent) to proceed without reservation.
    pub proceed: f64,
    /// Minimum rate (percent) to proceed with caution.
    pub caution: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            proceed: 95.0,
            caution: 90.0,
        }
    }
}

/// Recommendation banner shown at the end of every reconciliation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Proceed,
    ProceedWithCaution,
    DoNotProceed,
}

impl Recommendation {
    /// Classify a consistency rate (percent) against the thresholds.
    #[must_use]
    pub fn from_rate(rate: f64, thresholds: &RecommendationThresholds) -> Self {
        if rate >= thresholds.proceed {
            Self::Proceed
        } else if rate >= thresholds.caution {
            Self::ProceedWithCaution
        } else {
            Self::DoNotProceed
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::ProceedWithCaution => "proceed_with_caution",
            Self::DoNotProceed => "do_not_proceed",
        }
    }

    /// Human-readable banner text used in reports.
    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::ProceedWithCaution => "proceed with caution",
            Self::DoNotProceed => "do not proceed, investigate",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(100.0, Recommendation::Proceed)]
    #[case(95.0, Recommendation::Proceed)]
    #[case(94.9, Recommendation::ProceedWithCaution)]
    #[case(90.0, Recommendation::ProceedWithCaution)]
    #[case(89.99, Recommendation::DoNotProceed)]
    #[case(0.0, Recommendation::DoNotProceed)]
    fn recommendation_uses_default_thresholds(#[case] rate: f64, #[case] expected: Recommendation) {
        let thresholds = RecommendationThresholds::default();
        assert_eq!(Recommendation::from_rate(rate, &thresholds), expected);
    }

    #[test]
    fn recommendation_honors_custom_thresholds() {
        let thresholds = RecommendationThresholds {
            proceed: 99.0,
            caution: 97.0,
        };
        assert_eq!(
            Recommendation::from_rate(98.0, &thresholds),
            Recommendation::ProceedWithCaution
        );
        assert_eq!(
            Recommendation::from_rate(95.0, &thresholds),
            Recommendation::DoNotProceed
        );
    }

    #[test]
    fn session_happy_path_transitions() {
        use SessionState::*;
        assert!(Idle.can_transition_to(ConnectionsEstablished));
        assert!(ConnectionsEstablished.can_transition_to(WritesInProgress));
        assert!(WritesInProgress.can_transition_to(Reconciling));
        assert!(Reconciling.can_transition_to(Completed));
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_state() {
        use SessionState::*;
        for state in [Idle, ConnectionsEstablished, WritesInProgress, Reconciling] {
            assert!(state.can_transition_to(Failed), "{state} -> failed");
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(SessionState::Completed.allowed_next_states().is_empty());
        assert!(SessionState::Failed.allowed_next_states().is_empty());
        assert!(SessionState::Completed.is_terminal());
    }

    #[test]
    fn skipping_connections_is_rejected() {
        assert!(!SessionState::Idle.can_transition_to(SessionState::WritesInProgress));
        assert!(!SessionState::Reconciling.can_transition_to(SessionState::WritesInProgress));
    }

    #[test]
    fn write_mode_parses_cli_and_config_spellings() {
        assert_eq!("sync-both".parse::<WriteMode>().unwrap(), WriteMode::SyncBoth);
        assert_eq!(
            "async_secondary".parse::<WriteMode>().unwrap(),
            WriteMode::AsyncSecondary
        );
        assert!("both".parse::<WriteMode>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SessionState::ConnectionsEstablished).unwrap();
        assert_eq!(json, "\"connections_established\"");
        let json = serde_json::to_string(&Recommendation::ProceedWithCaution).unwrap();
        assert_eq!(json, "\"proceed_with_caution\"");
    }
}
