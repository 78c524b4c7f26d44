//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Execution journal contract and storage bindings."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! Durable record of which run-once scripts have been applied.
//!
//! The journal is read once per run as a name snapshot and written after
//! each successful run-once script. Entries are append-only.
#![warn(missing_docs)]

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ratchet_core::{NameComparer, Session, TargetError};
use serde::{Deserialize, Serialize};

/// Result alias used throughout the journal crate.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Error type for the journal subsystem.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The target rejected a journal read or write.
    #[error("journal target error: {0}")]
    Target(#[from] TargetError),
    /// Wrapper for IO errors encountered while reading/writing journal files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// A journal file line could not be decoded.
    #[error("corrupt journal {path} at line {line}: {source}")]
    Corrupt {
        /// Journal file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Configured table name is not a plain SQL identifier.
    #[error("invalid journal table name `{0}`")]
    InvalidTableName(String),
    /// File header names a format other than the journal's.
    #[error("{path} is not a ratchet journal (format `{format}`)")]
    UnknownFormat {
        /// Offending file.
        path: PathBuf,
        /// Format found in the header.
        format: String,
    },
    /// Journal file was written by a newer format.
    #[error("journal {path} has unsupported format version {version}")]
    UnsupportedVersion {
        /// Journal file.
        path: PathBuf,
        /// Version found in the header.
        version: u16,
    },
}

/// One applied script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Journal key of the script.
    pub script_name: String,
    /// When the script was applied.
    pub applied_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Entry stamped with the current time.
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Persistent store of applied script names.
pub trait Journal {
    /// Short label used in logs.
    fn describe(&self) -> String;

    /// Names of every journaled script.
    ///
    /// Must not create backing storage; an absent journal is empty.
    fn executed_scripts(&mut self, session: &mut dyn Session) -> Result<BTreeSet<String>>;

    /// Record an applied script. Storing a name that is already present is
    /// a no-op.
    fn store_executed(&mut self, session: &mut dyn Session, entry: &JournalEntry) -> Result<()>;

    /// Create backing storage if it does not exist yet.
    fn ensure_ready(&mut self, session: &mut dyn Session) -> Result<()>;

    /// Whether writes go through the session and therefore share its
    /// transaction.
    fn is_transactional(&self) -> bool {
        true
    }

    /// Match names with `comparer` from now on.
    ///
    /// The engine calls this when it is built, so a journal never treats two
    /// names as the same script unless the engine does too.
    fn set_comparer(&mut self, _comparer: NameComparer) {}
}

pub mod file;
pub mod null;
pub mod sqlite;
pub mod table;

pub use file::FileJournal;
pub use null::NullJournal;
pub use sqlite::SqliteSession;
pub use table::{validate_table_name, TableJournal, DEFAULT_JOURNAL_TABLE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &mut dyn Journal) {}
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = JournalError::InvalidTableName("drop table".into());
        assert_eq!(err.to_string(), "invalid journal table name `drop table`");

        let err = JournalError::from(TargetError::Rejected("no such table".into()));
        assert!(err.to_string().contains("no such table"));
    }
}
