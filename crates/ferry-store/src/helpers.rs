//! Row-to-record parsing helpers.
//!
//! Columns are read by index in the order `id, name, email, gender, address`.
//! A NULL field reads as an empty string, so a row written by another tool
//! with missing values still compares (and mismatches) field by field.

use ferry_core::{Record, RecordFields, RecordKey};

use crate::error::StoreError;

/// Read a TEXT column, mapping SQL NULL to `""`.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, so nullable
/// columns go through `Option<String>`.
///
/// # Errors
///
/// Returns `StoreError` if the column read fails.
pub fn get_text_or_empty(row: &libsql::Row, idx: i32) -> Result<String, StoreError> {
    Ok(row.get::<Option<String>>(idx)?.unwrap_or_default())
}

/// Parse the key column.
///
/// # Errors
///
/// Returns `StoreError::InvalidRow` if the column does not hold a key.
pub fn key_from_row(row: &libsql::Row, idx: i32) -> Result<RecordKey, StoreError> {
    let raw = row.get::<String>(idx)?;
    raw.parse::<RecordKey>()
        .map_err(|e| StoreError::InvalidRow(format!("id '{raw}': {e}")))
}

/// Parse a full `records` row.
///
/// # Errors
///
/// Returns `StoreError` if the key is malformed or a column read fails.
pub fn record_from_row(row: &libsql::Row) -> Result<Record, StoreError> {
    Ok(Record::new(
        key_from_row(row, 0)?,
        RecordFields {
            name: get_text_or_empty(row, 1)?,
            email: get_text_or_empty(row, 2)?,
            gender: get_text_or_empty(row, 3)?,
            address: get_text_or_empty(row, 4)?,
        },
    ))
}
