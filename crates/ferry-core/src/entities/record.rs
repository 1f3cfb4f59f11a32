use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// Attribute fields in the order they are compared and reported.
pub const FIELD_NAMES: [&str; 4] = ["name", "email", "gender", "address"];

/// Immutable identity of a migrated record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct RecordKey(Uuid);

impl RecordKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::Validation(format!("invalid record key '{s}': {e}")))
    }
}

/// The four string attributes carried by every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RecordFields {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub address: String,
}

impl RecordFields {
    /// Look up a field by its column name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "gender" => Some(&self.gender),
            "address" => Some(&self.address),
            _ => None,
        }
    }

    /// Iterate `(field, value)` pairs in [`FIELD_NAMES`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("gender", self.gender.as_str()),
            ("address", self.address.as_str()),
        ]
        .into_iter()
    }

    /// Reject empty or whitespace-only values.
    ///
    /// Pattern constraints (email shape, gender vocabulary) belong to the
    /// ingesting front-end and are not checked here. Values are never trimmed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first empty field.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in self.iter() {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "field '{field}' must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// A keyed entity as stored in either data store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    pub key: RecordKey,
    pub fields: RecordFields,
}

impl Record {
    #[must_use]
    pub const fn new(key: RecordKey, fields: RecordFields) -> Self {
        Self { key, fields }
    }
}

/// A caller-constructed write, handed off to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WriteRequest {
    /// Caller-supplied key. A new key is generated when absent.
    pub key: Option<RecordKey>,
    pub fields: RecordFields,
}

impl WriteRequest {
    #[must_use]
    pub const fn new(fields: RecordFields) -> Self {
        Self { key: None, fields }
    }

    #[must_use]
    pub const fn with_key(key: RecordKey, fields: RecordFields) -> Self {
        Self {
            key: Some(key),
            fields,
        }
    }

    /// Validate the request and turn it into a keyed record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if any field is empty.
    pub fn into_record(self) -> Result<Record, CoreError> {
        self.fields.validate()?;
        Ok(Record {
            key: self.key.unwrap_or_else(RecordKey::generate),
            fields: self.fields,
        })
    }
}
