use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::RecordKey;
use crate::enums::StoreRole;

/// Why a store write was never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Origin rejected the write; the target is never written alone.
    OriginFailed,
    /// The session runs degraded without a target connection.
    TargetUnavailable,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OriginFailed => "origin_failed",
            Self::TargetUnavailable => "target_unavailable",
        }
    }
}

/// Result of one write against one store. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WriteOutcome {
    pub key: RecordKey,
    pub store: StoreRole,
    pub succeeded: bool,
    pub error: Option<String>,
    pub skipped: Option<SkipReason>,
    pub elapsed_ms: u64,
}

impl WriteOutcome {
    #[must_use]
    pub fn succeeded(key: RecordKey, store: StoreRole, elapsed: Duration) -> Self {
        Self {
            key,
            store,
            succeeded: true,
            error: None,
            skipped: None,
            elapsed_ms: duration_ms(elapsed),
        }
    }

    #[must_use]
    pub fn failed(
        key: RecordKey,
        store: StoreRole,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            key,
            store,
            succeeded: false,
            error: Some(error.into()),
            skipped: None,
            elapsed_ms: duration_ms(elapsed),
        }
    }

    #[must_use]
    pub fn skipped(key: RecordKey, store: StoreRole, reason: SkipReason) -> Self {
        Self {
            key,
            store,
            succeeded: false,
            error: Some(reason.as_str().to_string()),
            skipped: Some(reason),
            elapsed_ms: 0,
        }
    }

    /// Whether the store was actually contacted.
    #[must_use]
    pub const fn was_attempted(&self) -> bool {
        self.skipped.is_none()
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
