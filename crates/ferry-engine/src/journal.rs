//! JSONL outcome journal.
//!
//! Appends every [`WriteOutcome`] of a session to
//! `{dir}/outcomes_{session_id}.jsonl` using `serde_jsonlines::append_json_lines`.
//! Asynchronous target writes finish after the caller has moved on; the
//! journal is where their outcomes are recorded for later reconciliation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use ferry_core::WriteOutcome;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub session: String,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: WriteOutcome,
}

/// Append-only per-session log of write outcomes.
pub struct OutcomeJournal {
    session: String,
    path: Option<PathBuf>,
    // Serializes appends from concurrent workers so lines never interleave.
    lock: Mutex<()>,
}

impl OutcomeJournal {
    /// Create a journal for `session` inside `dir`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Io` if the directory cannot be created.
    pub fn new(dir: &Path, session: impl Into<String>) -> Result<Self, EngineError> {
        std::fs::create_dir_all(dir)?;
        let session = session.into();
        let path = dir.join(format!("outcomes_{session}.jsonl"));
        Ok(Self {
            session,
            path: Some(path),
            lock: Mutex::new(()),
        })
    }

    /// A journal that records nothing (dry runs, tests).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            session: String::new(),
            path: None,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// File receiving the entries, if enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one outcome.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Journal` if the file write fails.
    pub fn append(&self, outcome: &WriteOutcome) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let entry = JournalEntry {
            session: self.session.clone(),
            at: Utc::now(),
            outcome: outcome.clone(),
        };
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        serde_jsonlines::append_json_lines(path, [&entry]).map_err(|e| EngineError::Journal {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Append, logging instead of failing. A journal fault never fails a write.
    pub fn record(&self, outcome: &WriteOutcome) {
        if let Err(error) = self.append(outcome) {
            tracing::warn!(key = %outcome.key, store = %outcome.store, %error, "journal append failed");
        }
    }

    /// Read every entry from a journal file, in append order.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Journal` if the file cannot be read or a line
    /// does not parse.
    pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, EngineError> {
        let to_error = |e: std::io::Error| EngineError::Journal {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        serde_jsonlines::json_lines::<JournalEntry, _>(path)
            .map_err(to_error)?
            .collect::<std::io::Result<Vec<JournalEntry>>>()
            .map_err(to_error)
    }
}
