//! Domain types for records, outcomes, and consistency state.
//!
//! All types derive `Serialize` and `JsonSchema`. `ConsistencyResult` is
//! deliberately not `Deserialize`: its match flag is derived on construction.

mod consistency;
mod metrics;
mod outcome;
mod record;
mod summary;

pub use consistency::{
    ConsistencyClass, ConsistencyResult, Existence, FieldDifference, ReadOutcome,
};
pub use metrics::{MetricsSnapshot, StoreLatency};
pub use outcome::{SkipReason, WriteOutcome};
pub use record::{FIELD_NAMES, Record, RecordFields, RecordKey, WriteRequest};
pub use summary::{ValidationSummary, consistency_rate};
