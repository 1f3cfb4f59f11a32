use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Write latency observed against one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreLatency {
    pub average_ms: u64,
    pub max_ms: u64,
}

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetricsSnapshot {
    pub origin_writes: u64,
    pub target_writes: u64,
    pub consistency_checks: u64,
    pub errors: u64,
    pub origin_latency: StoreLatency,
    pub target_latency: StoreLatency,
}

impl MetricsSnapshot {
    #[must_use]
    pub const fn total_writes(&self) -> u64 {
        self.origin_writes + self.target_writes
    }
}
