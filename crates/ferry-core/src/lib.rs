//! # ferry-core
//!
//! Core types shared across all ferry crates.
//!
//! - Record, key, and field types for the migrated entity
//! - Per-store write outcomes and three-state read existence
//! - Consistency results and the aggregate validation summary
//! - Mode and lifecycle enums with state machine transitions
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;

pub use entities::{
    ConsistencyClass, ConsistencyResult, Existence, FIELD_NAMES, FieldDifference,
    MetricsSnapshot, ReadOutcome, Record, RecordFields, RecordKey, SkipReason, StoreLatency,
    ValidationSummary, WriteOutcome, WriteRequest,
};
pub use enums::{
    Recommendation, RecommendationThresholds, SessionState, StoreRole, ValidationScope, WriteMode,
};
pub use errors::CoreError;
