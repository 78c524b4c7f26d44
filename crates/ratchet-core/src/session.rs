//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Target session contract used by the engine, journals and code scripts."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use crate::error::TargetError;

/// Command factory and executor for one target datastore.
///
/// Sessions are opened and closed by the caller; the engine only borrows
/// them. Transactions are flat: `begin` while a transaction is open is an
/// error.
pub trait Session {
    /// Human readable identification of the target, for logs.
    fn describe(&self) -> String;

    /// Execute a script body, which may contain several statements.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the target rejects any statement. Earlier
    /// statements of the same body may already have taken effect.
    fn execute(&mut self, sql: &str) -> Result<(), TargetError>;

    /// Execute one parameterised statement and return the affected row count.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the statement fails.
    fn execute_with(&mut self, sql: &str, params: &[&str]) -> Result<usize, TargetError>;

    /// Run a query and return the first column of each row as text.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the query fails.
    fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>, TargetError>;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Transaction`] if one is already open.
    fn begin(&mut self) -> Result<(), TargetError>;

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if nothing is open or the commit fails.
    fn commit(&mut self) -> Result<(), TargetError>;

    /// Roll back the open transaction; a no-op when none is open.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if the rollback itself fails.
    fn rollback(&mut self) -> Result<(), TargetError>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &mut dyn Session) {}
    }
}
