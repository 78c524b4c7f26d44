//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Journal stored as a table inside the target database."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use chrono::SecondsFormat;
use ratchet_core::{CaseSensitivity, NameComparer, Session};
use tracing::debug;

use crate::{Journal, JournalEntry, JournalError, Result};

/// Table used when none is configured.
pub const DEFAULT_JOURNAL_TABLE: &str = "schema_versions";

const MAX_TABLE_NAME_LEN: usize = 128;

/// Check that `name` is a plain SQL identifier safe to interpolate.
///
/// # Errors
///
/// Returns [`JournalError::InvalidTableName`] otherwise.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_start && valid_rest && name.len() <= MAX_TABLE_NAME_LEN {
        Ok(())
    } else {
        Err(JournalError::InvalidTableName(name.to_owned()))
    }
}

/// Journal kept in a table of the target itself, so entries commit and roll
/// back together with the scripts they describe.
///
/// The SQL is written for `SQLite`. The table is created by the first write;
/// reads against a database without it report nothing executed.
#[derive(Debug, Clone)]
pub struct TableJournal {
    table: String,
    comparer: NameComparer,
}

impl TableJournal {
    /// Journal in [`DEFAULT_JOURNAL_TABLE`].
    pub fn new() -> Self {
        Self {
            table: DEFAULT_JOURNAL_TABLE.to_owned(),
            comparer: NameComparer::default(),
        }
    }

    /// Journal in a custom table.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidTableName`] for anything but a plain
    /// identifier.
    pub fn with_table(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            table,
            comparer: NameComparer::default(),
        })
    }

    /// Use `comparer` when deciding whether an entry already exists.
    pub fn with_comparer(mut self, comparer: NameComparer) -> Self {
        self.comparer = comparer;
        self
    }

    /// Backing table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn table_exists(&self, session: &mut dyn Session) -> Result<bool> {
        let found = session.query_strings(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[self.table.as_str()],
        )?;
        Ok(!found.is_empty())
    }

    fn collation(&self) -> &'static str {
        match self.comparer.sensitivity() {
            CaseSensitivity::Insensitive => " COLLATE NOCASE",
            CaseSensitivity::Sensitive => "",
        }
    }
}

impl Default for TableJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal for TableJournal {
    fn describe(&self) -> String {
        format!("table:{}", self.table)
    }

    fn executed_scripts(&mut self, session: &mut dyn Session) -> Result<BTreeSet<String>> {
        if !self.table_exists(session)? {
            debug!(table = %self.table, "journal table absent; nothing executed yet");
            return Ok(BTreeSet::new());
        }
        let sql = format!("SELECT script_name FROM {} ORDER BY id", self.table);
        Ok(session.query_strings(&sql, &[])?.into_iter().collect())
    }

    fn store_executed(&mut self, session: &mut dyn Session, entry: &JournalEntry) -> Result<()> {
        self.ensure_ready(session)?;
        let applied_at = entry.applied_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let sql = format!(
            "INSERT INTO {table} (script_name, applied_at) SELECT ?1, ?2 \
             WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE script_name = ?1{collation})",
            table = self.table,
            collation = self.collation(),
        );
        let inserted =
            session.execute_with(&sql, &[entry.script_name.as_str(), applied_at.as_str()])?;
        if inserted == 0 {
            debug!(script = %entry.script_name, "journal entry already present");
        }
        Ok(())
    }

    fn ensure_ready(&mut self, session: &mut dyn Session) -> Result<()> {
        // Always issued: a rolled-back transaction may have undone an earlier create.
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             script_name TEXT NOT NULL, \
             applied_at TEXT NOT NULL)",
            self.table
        );
        session.execute(&sql)?;
        debug!(table = %self.table, "journal table ready");
        Ok(())
    }
    fn set_comparer(&mut self, comparer: NameComparer) {
        self.comparer = comparer;
    }
}
