//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "tests"
//! ratchet_type: "test"
//! ratchet_scope: "code"
//! ratchet_description: "Journal behaviour across reopened sessions."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use ratchet_core::Session;
use ratchet_journal::{
    FileJournal, Journal, JournalEntry, NullJournal, SqliteSession, TableJournal,
};
use tempfile::tempdir;

#[test]
fn table_journal_survives_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("app.db");

    {
        let mut session = SqliteSession::open(&db)?;
        let mut journal = TableJournal::new();
        session.begin()?;
        journal.store_executed(&mut session, &JournalEntry::new("001_create.sql"))?;
        session.commit()?;
    }

    let mut session = SqliteSession::open(&db)?;
    let executed = TableJournal::new().executed_scripts(&mut session)?;
    assert!(executed.contains("001_create.sql"));

    let applied_at = session.query_strings(
        "SELECT applied_at FROM schema_versions WHERE script_name = ?1",
        &["001_create.sql"],
    )?;
    assert_eq!(applied_at.len(), 1);
    assert!(applied_at[0].ends_with('Z'));
    Ok(())
}

#[test]
fn file_journal_ignores_session_rollback() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let mut session = SqliteSession::in_memory()?;
    let mut journal = FileJournal::new(dir.path().join("journal.jsonl"));

    session.begin()?;
    journal.store_executed(&mut session, &JournalEntry::new("001.sql"))?;
    session.rollback()?;

    assert_eq!(journal.executed_scripts(&mut session)?.len(), 1);
    Ok(())
}

#[test]
fn null_journal_never_remembers() -> anyhow::Result<()> {
    let mut session = SqliteSession::in_memory()?;
    let mut journal = NullJournal;
    journal.store_executed(&mut session, &JournalEntry::new("001.sql"))?;
    assert!(journal.executed_scripts(&mut session)?.is_empty());
    assert_eq!(journal.describe(), "null");
    Ok(())
}
