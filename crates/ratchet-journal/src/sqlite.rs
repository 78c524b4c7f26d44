//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "SQLite-backed target session."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! `SQLite` implementation of [`Session`].

use std::path::Path;
use std::time::Duration;

use ratchet_core::{Session, TargetError};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Session over one `SQLite` connection.
///
/// Create with [`SqliteSession::open`] for a database file or
/// [`SqliteSession::in_memory`] for tests.
pub struct SqliteSession {
    conn: Connection,
    label: String,
}

impl SqliteSession {
    /// Open or create a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Backend`] if the directory can't be created or
    /// the database can't be opened.
    pub fn open(path: &Path) -> Result<Self, TargetError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(TargetError::backend)?;
            }
        }
        let conn = Connection::open(path).map_err(TargetError::backend)?;
        Ok(Self {
            conn,
            label: format!("sqlite:{}", path.display()),
        })
    }

    /// Private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Backend`] if the database can't be created.
    pub fn in_memory() -> Result<Self, TargetError> {
        let conn = Connection::open_in_memory().map_err(TargetError::backend)?;
        Ok(Self {
            conn,
            label: "sqlite::memory:".to_owned(),
        })
    }

    /// Wait up to `timeout` for locks held by other connections.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Backend`] if the pragma is rejected.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self, TargetError> {
        self.conn
            .busy_timeout(timeout)
            .map_err(TargetError::backend)?;
        Ok(self)
    }

    /// Underlying connection, for callers that need driver features.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Session for SqliteSession {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn execute(&mut self, sql: &str) -> Result<(), TargetError> {
        self.conn.execute_batch(sql).map_err(TargetError::backend)
    }

    fn execute_with(&mut self, sql: &str, params: &[&str]) -> Result<usize, TargetError> {
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(TargetError::backend)
    }

    fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>, TargetError> {
        let mut stmt = self.conn.prepare(sql).map_err(TargetError::backend)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))
            .map_err(TargetError::backend)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(TargetError::backend)
    }

    fn begin(&mut self) -> Result<(), TargetError> {
        if !self.conn.is_autocommit() {
            return Err(TargetError::Transaction(
                "a transaction is already open".into(),
            ));
        }
        debug!(session = %self.label, "begin transaction");
        self.conn
            .execute_batch("BEGIN")
            .map_err(TargetError::backend)
    }

    fn commit(&mut self) -> Result<(), TargetError> {
        if self.conn.is_autocommit() {
            return Err(TargetError::Transaction("no open transaction".into()));
        }
        debug!(session = %self.label, "commit transaction");
        self.conn
            .execute_batch("COMMIT")
            .map_err(TargetError::backend)
    }

    fn rollback(&mut self) -> Result<(), TargetError> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        debug!(session = %self.label, "rollback transaction");
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(TargetError::backend)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(session: &mut SqliteSession) -> usize {
        session
            .query_strings("SELECT CAST(COUNT(*) AS TEXT) FROM t", &[])
            .unwrap()[0]
            .parse()
            .unwrap()
    }

    #[test]
    fn rollback_discards_work() {
        let mut session = SqliteSession::in_memory().unwrap();
        session.execute("CREATE TABLE t (v TEXT);").unwrap();

        session.begin().unwrap();
        assert!(session.in_transaction());
        session
            .execute_with("INSERT INTO t (v) VALUES (?1)", &["a"])
            .unwrap();
        session.rollback().unwrap();

        assert!(!session.in_transaction());
        assert_eq!(count(&mut session), 0);
    }

    #[test]
    fn ddl_is_transactional() {
        let mut session = SqliteSession::in_memory().unwrap();
        session.begin().unwrap();
        session
            .execute("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('x');")
            .unwrap();
        session.rollback().unwrap();

        let tables = session
            .query_strings(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                &["t"],
            )
            .unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut session = SqliteSession::in_memory().unwrap();
        session.begin().unwrap();
        let err = session.begin().unwrap_err();
        assert!(matches!(err, TargetError::Transaction(_)));
        session.commit().unwrap();
    }

    #[test]
    fn rollback_without_transaction_is_noop() {
        let mut session = SqliteSession::in_memory().unwrap();
        session.rollback().unwrap();
        assert!(session.commit().is_err());
    }

    #[test]
    fn rejected_statement_surfaces_backend_error() {
        let mut session = SqliteSession::in_memory().unwrap();
        let err = session.execute("CREATE TABLE;").unwrap_err();
        assert!(matches!(err, TargetError::Backend(_)));
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");
        let mut session = SqliteSession::open(&path)
            .unwrap()
            .with_busy_timeout(Duration::from_millis(250))
            .unwrap();
        session.execute("CREATE TABLE t (v TEXT);").unwrap();
        assert!(path.exists());
        assert!(session.describe().starts_with("sqlite:"));
    }
}
