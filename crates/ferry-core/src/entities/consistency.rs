use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Record, RecordKey};

/// Outcome of reading one key from one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(Record),
    NotFound,
    /// The read itself errored. Distinct from `NotFound`.
    Failed(String),
}

impl ReadOutcome {
    #[must_use]
    pub fn existence(&self) -> Existence {
        match self {
            Self::Found(_) => Existence::Exists,
            Self::NotFound => Existence::Absent,
            Self::Failed(error) => Existence::Unknown {
                error: error.clone(),
            },
        }
    }
}

/// Three-state existence of a key in one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Existence {
    Exists,
    Absent,
    /// The read failed, so presence could not be determined.
    Unknown { error: String },
}

impl Existence {
    #[must_use]
    pub const fn exists(&self) -> bool {
        matches!(self, Self::Exists)
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// One field whose value differs between the stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FieldDifference {
    pub field: String,
    pub origin_value: String,
    pub target_value: String,
}

impl FieldDifference {
    #[must_use]
    pub fn new(field: &str, origin_value: &str, target_value: &str) -> Self {
        Self {
            field: field.to_string(),
            origin_value: origin_value.to_string(),
            target_value: target_value.to_string(),
        }
    }
}

/// How a single comparison is bucketed in the summary and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyClass {
    Consistent,
    Mismatched,
    MissingInOrigin,
    MissingInTarget,
    MissingInBoth,
    ReadFailure,
}

/// Per-record comparison between origin and target.
///
/// Built only through [`ConsistencyResult::compare`]; `fields_match` is
/// derived there and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ConsistencyResult {
    key: RecordKey,
    origin: Existence,
    target: Existence,
    fields_match: bool,
    differences: Vec<FieldDifference>,
}

impl ConsistencyResult {
    /// Compare the two reads of `key`.
    ///
    /// Field values are compared with exact, case- and whitespace-sensitive
    /// equality in [`crate::FIELD_NAMES`] order. Records missing or unreadable
    /// on either side are never compared field by field.
    #[must_use]
    pub fn compare(key: RecordKey, origin: &ReadOutcome, target: &ReadOutcome) -> Self {
        let differences = match (origin, target) {
            (ReadOutcome::Found(o), ReadOutcome::Found(t)) => o
                .fields
                .iter()
                .zip(t.fields.iter())
                .filter(|((_, ov), (_, tv))| ov != tv)
                .map(|((field, ov), (_, tv))| FieldDifference::new(field, ov, tv))
                .collect(),
            _ => Vec::new(),
        };
        let origin = origin.existence();
        let target = target.existence();
        let fields_match = origin.exists() && target.exists() && differences.is_empty();
        Self {
            key,
            origin,
            target,
            fields_match,
            differences,
        }
    }

    #[must_use]
    pub const fn key(&self) -> RecordKey {
        self.key
    }

    #[must_use]
    pub const fn origin(&self) -> &Existence {
        &self.origin
    }

    #[must_use]
    pub const fn target(&self) -> &Existence {
        &self.target
    }

    #[must_use]
    pub const fn exists_in_origin(&self) -> bool {
        self.origin.exists()
    }

    #[must_use]
    pub const fn exists_in_target(&self) -> bool {
        self.target.exists()
    }

    #[must_use]
    pub const fn fields_match(&self) -> bool {
        self.fields_match
    }

    #[must_use]
    pub fn differences(&self) -> &[FieldDifference] {
        &self.differences
    }

    /// Whether either read failed rather than returning found/not-found.
    #[must_use]
    pub const fn has_read_failure(&self) -> bool {
        self.origin.is_unknown() || self.target.is_unknown()
    }

    #[must_use]
    pub const fn classification(&self) -> ConsistencyClass {
        if self.has_read_failure() {
            return ConsistencyClass::ReadFailure;
        }
        match (self.origin.exists(), self.target.exists()) {
            (true, true) if self.fields_match => ConsistencyClass::Consistent,
            (true, true) => ConsistencyClass::Mismatched,
            (false, true) => ConsistencyClass::MissingInOrigin,
            (true, false) => ConsistencyClass::MissingInTarget,
            (false, false) => ConsistencyClass::MissingInBoth,
        }
    }
}
