//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Append-only JSON lines journal kept outside the target."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ratchet_core::{NameComparer, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Journal, JournalEntry, JournalError, Result};

/// Format version written into new journal headers.
pub const FILE_JOURNAL_VERSION: u16 = 1;

const FILE_JOURNAL_FORMAT: &str = "ratchet-journal";

/// Header stored as the first line in the journal file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileJournalHeader {
    format: String,
    version: u16,
    created_at: DateTime<Utc>,
}

impl FileJournalHeader {
    fn new() -> Self {
        Self {
            format: FILE_JOURNAL_FORMAT.to_owned(),
            version: FILE_JOURNAL_VERSION,
            created_at: Utc::now(),
        }
    }
}

/// One line of the journal file after the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FileJournalRecord {
    sequence: u64,
    script_name: String,
    applied_at: DateTime<Utc>,
}

/// Journal appended to a local file, one JSON object per line.
///
/// Writes do not take part in the session's transaction. The file and its
/// header are created by the first write.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
    comparer: NameComparer,
}

impl FileJournal {
    /// Journal stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            comparer: NameComparer::default(),
        }
    }

    /// Use `comparer` when deciding whether an entry already exists.
    pub fn with_comparer(mut self, comparer: NameComparer) -> Self {
        self.comparer = comparer;
        self
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<Vec<FileJournalRecord>> {
        if !self.path.exists() || is_empty(&self.path)? {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut lines = reader.lines().enumerate();

        if let Some((_, header)) = lines.next() {
            let header: FileJournalHeader =
                serde_json::from_str(&header?).map_err(|source| JournalError::Corrupt {
                    path: self.path.clone(),
                    line: 1,
                    source,
                })?;
            if header.format != FILE_JOURNAL_FORMAT {
                return Err(JournalError::UnknownFormat {
                    path: self.path.clone(),
                    format: header.format,
                });
            }
            if header.version > FILE_JOURNAL_VERSION {
                return Err(JournalError::UnsupportedVersion {
                    path: self.path.clone(),
                    version: header.version,
                });
            }
        }

        let mut records = Vec::new();
        for (index, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record =
                serde_json::from_str(&line).map_err(|source| JournalError::Corrupt {
                    path: self.path.clone(),
                    line: index + 1,
                    source,
                })?;
            records.push(record);
        }
        Ok(records)
    }
}

fn is_empty(path: &Path) -> Result<bool> {
    Ok(fs::metadata(path)?.len() == 0)
}

impl Journal for FileJournal {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn executed_scripts(&mut self, _session: &mut dyn Session) -> Result<BTreeSet<String>> {
        Ok(self
            .read_records()?
            .into_iter()
            .map(|record| record.script_name)
            .collect())
    }

    fn store_executed(&mut self, session: &mut dyn Session, entry: &JournalEntry) -> Result<()> {
        self.ensure_ready(session)?;
        let records = self.read_records()?;
        if self.comparer.contains(
            records.iter().map(|r| r.script_name.as_str()),
            &entry.script_name,
        ) {
            debug!(script = %entry.script_name, "journal entry already present");
            return Ok(());
        }

        let record = FileJournalRecord {
            sequence: records.last().map_or(0, |r| r.sequence) + 1,
            script_name: entry.script_name.clone(),
            applied_at: entry.applied_at,
        };
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }

    fn ensure_ready(&mut self, _session: &mut dyn Session) -> Result<()> {
        if self.path.exists() && !is_empty(&self.path)? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &FileJournalHeader::new())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %self.path.display(), "created journal file");
        Ok(())
    }

    fn is_transactional(&self) -> bool {
        false
    }

    fn set_comparer(&mut self, comparer: NameComparer) {
        self.comparer = comparer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteSession;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_empty_and_is_not_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let mut journal = FileJournal::new(&path);
        let mut session = SqliteSession::in_memory().unwrap();

        assert!(journal.executed_scripts(&mut session).unwrap().is_empty());
        assert!(!path.exists());
        assert!(!journal.is_transactional());
    }

    #[test]
    fn append_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("journal.jsonl");
        let mut session = SqliteSession::in_memory().unwrap();

        let mut journal = FileJournal::new(&path);
        journal
            .store_executed(&mut session, &JournalEntry::new("001.sql"))
            .unwrap();
        journal
            .store_executed(&mut session, &JournalEntry::new("002.sql"))
            .unwrap();
        journal
            .store_executed(&mut session, &JournalEntry::new("001.SQL"))
            .unwrap();

        let mut reopened = FileJournal::new(&path);
        let names: Vec<_> = reopened
            .executed_scripts(&mut session)
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec!["001.sql", "002.sql"]);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().last().unwrap().contains("\"sequence\":2"));
    }

    #[test]
    fn newer_format_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        fs::write(
            &path,
            "{\"format\":\"ratchet-journal\",\"version\":9,\"created_at\":\"2024-01-01T00:00:00Z\"}\n",
        )
        .unwrap();

        let mut session = SqliteSession::in_memory().unwrap();
        let err = FileJournal::new(&path)
            .executed_scripts(&mut session)
            .unwrap_err();
        assert!(matches!(err, JournalError::UnsupportedVersion { version: 9, .. }));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        fs::write(
            &path,
            "{\"format\":\"audit-log\",\"version\":1,\"created_at\":\"2024-01-01T00:00:00Z\"}\n",
        )
        .unwrap();

        let mut session = SqliteSession::in_memory().unwrap();
        let mut journal = FileJournal::new(&path);
        let err = journal.executed_scripts(&mut session).unwrap_err();
        assert!(matches!(err, JournalError::UnknownFormat { ref format, .. } if format == "audit-log"));
        assert!(journal
            .store_executed(&mut session, &JournalEntry::new("001.sql"))
            .is_err());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn set_comparer_switches_duplicate_detection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let mut session = SqliteSession::in_memory().unwrap();
        let mut journal = FileJournal::new(&path);
        journal.set_comparer(NameComparer::case_sensitive());
        journal
            .store_executed(&mut session, &JournalEntry::new("A.sql"))
            .unwrap();
        journal
            .store_executed(&mut session, &JournalEntry::new("a.sql"))
            .unwrap();

        assert_eq!(journal.executed_scripts(&mut session).unwrap().len(), 2);
    }

    #[test]
    fn corrupt_line_reports_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let mut session = SqliteSession::in_memory().unwrap();
        let mut journal = FileJournal::new(&path);
        journal
            .store_executed(&mut session, &JournalEntry::new("001.sql"))
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"not json\n").unwrap();

        let err = journal.executed_scripts(&mut session).unwrap_err();
        assert!(matches!(err, JournalError::Corrupt { line: 3, .. }));
    }
}
