//! ---
//! ratchet_section: "09-testing"
//! ratchet_subsection: "harness"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "In-memory target, journal and providers shared by tests."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! The test harness crate provides a scriptable in-memory target so engine
//! scenarios can assert on exactly what reached the datastore, what was
//! journaled and which scripts were materialised.
//!
//! Statements are split on `;`. Work done inside a transaction is buffered
//! and only becomes visible in [`MemoryTarget::applied`] after commit.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use ratchet_core::{
    NameComparer, ProviderError, Script, ScriptOptions, ScriptProvider, Session, TargetError,
};
use ratchet_journal::{Journal, JournalEntry, JournalError};
use tracing::debug;

/// Transaction control calls observed by a [`MemoryTarget`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCounts {
    /// Successful `begin` calls.
    pub begun: usize,
    /// Successful `commit` calls.
    pub committed: usize,
    /// `rollback` calls that discarded an open transaction.
    pub rolled_back: usize,
}

#[derive(Debug, Default)]
struct Pending {
    statements: Vec<String>,
    journal: Vec<String>,
}

#[derive(Debug, Default)]
struct TargetState {
    applied: Vec<String>,
    journal: Vec<String>,
    pending: Option<Pending>,
    attempts: Vec<String>,
    fail_needles: Vec<String>,
    fail_journal_writes: bool,
    fail_commit: bool,
    journal_reads: usize,
    counts: TransactionCounts,
}

impl TargetState {
    fn visible_statements(&self) -> impl Iterator<Item = &String> {
        self.applied
            .iter()
            .chain(self.pending.iter().flat_map(|p| p.statements.iter()))
    }

    fn visible_journal(&self) -> impl Iterator<Item = &String> {
        self.journal
            .iter()
            .chain(self.pending.iter().flat_map(|p| p.journal.iter()))
    }

    fn apply(&mut self, statement: String) {
        match self.pending.as_mut() {
            Some(pending) => pending.statements.push(statement),
            None => self.applied.push(statement),
        }
    }
}

/// Scriptable in-memory [`Session`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    state: Arc<Mutex<TargetState>>,
}

impl MemoryTarget {
    /// Empty target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any statement containing `needle`.
    pub fn fail_when_contains(self, needle: impl Into<String>) -> Self {
        self.state.lock().fail_needles.push(needle.into());
        self
    }

    /// Make every journal write through [`MemoryJournal`] fail.
    pub fn set_fail_journal_writes(&self, fail: bool) {
        self.state.lock().fail_journal_writes = fail;
    }

    /// Make `commit` fail and discard the open transaction.
    pub fn set_fail_commit(&self, fail: bool) {
        self.state.lock().fail_commit = fail;
    }

    /// Committed (or autocommitted) statements in application order.
    pub fn applied(&self) -> Vec<String> {
        self.state.lock().applied.clone()
    }

    /// Every script body handed to `execute`, including failed ones.
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().attempts.clone()
    }

    /// Committed journal names in write order.
    pub fn journal_names(&self) -> Vec<String> {
        self.state.lock().journal.clone()
    }

    /// Pretend `names` were applied by an earlier run.
    pub fn seed_journal<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .journal
            .extend(names.into_iter().map(Into::into));
    }

    /// Journal sharing this target's state and transactions.
    pub fn journal(&self) -> MemoryJournal {
        MemoryJournal {
            state: Arc::clone(&self.state),
            transactional: true,
            comparer: NameComparer::default(),
        }
    }

    /// How many times the journal snapshot was read.
    pub fn journal_reads(&self) -> usize {
        self.state.lock().journal_reads
    }

    /// Transaction control calls so far.
    pub fn transactions(&self) -> TransactionCounts {
        self.state.lock().counts
    }
}

impl Session for MemoryTarget {
    fn describe(&self) -> String {
        "memory".to_owned()
    }

    fn execute(&mut self, sql: &str) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        state.attempts.push(sql.to_owned());
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(needle) = state
                .fail_needles
                .iter()
                .find(|needle| statement.contains(needle.as_str()))
            {
                return Err(TargetError::Rejected(format!(
                    "statement matched failure trigger `{needle}`"
                )));
            }
            state.apply(statement.to_owned());
        }
        Ok(())
    }

    fn execute_with(&mut self, sql: &str, params: &[&str]) -> Result<usize, TargetError> {
        let statement = if params.is_empty() {
            sql.to_owned()
        } else {
            format!("{sql} -- {}", params.join(", "))
        };
        self.execute(&statement)?;
        Ok(1)
    }

    fn query_strings(&mut self, sql: &str, _params: &[&str]) -> Result<Vec<String>, TargetError> {
        let state = self.state.lock();
        Ok(state
            .visible_statements()
            .filter(|statement| statement.starts_with(sql))
            .cloned()
            .collect())
    }

    fn begin(&mut self) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        if state.pending.is_some() {
            return Err(TargetError::Transaction(
                "a transaction is already open".into(),
            ));
        }
        state.pending = Some(Pending::default());
        state.counts.begun += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        let Some(pending) = state.pending.take() else {
            return Err(TargetError::Transaction("no open transaction".into()));
        };
        if state.fail_commit {
            state.counts.rolled_back += 1;
            return Err(TargetError::Transaction("commit refused".into()));
        }
        state.applied.extend(pending.statements);
        state.journal.extend(pending.journal);
        state.counts.committed += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        if let Some(pending) = state.pending.take() {
            debug!(
                statements = pending.statements.len(),
                journal = pending.journal.len(),
                "memory target rolled back"
            );
            state.counts.rolled_back += 1;
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state.lock().pending.is_some()
    }
}

/// Journal stored in a [`MemoryTarget`].
///
/// The transactional flavour buffers writes in the target's open
/// transaction; the non-transactional one writes straight to the committed
/// list like a file journal would.
#[derive(Debug, Clone)]
pub struct MemoryJournal {
    state: Arc<Mutex<TargetState>>,
    transactional: bool,
    comparer: NameComparer,
}

impl MemoryJournal {
    /// Variant whose writes ignore transactions.
    pub fn non_transactional(mut self) -> Self {
        self.transactional = false;
        self
    }
}

impl Journal for MemoryJournal {
    fn describe(&self) -> String {
        "memory".to_owned()
    }

    fn executed_scripts(
        &mut self,
        _session: &mut dyn Session,
    ) -> ratchet_journal::Result<BTreeSet<String>> {
        let mut state = self.state.lock();
        state.journal_reads += 1;
        Ok(state.visible_journal().cloned().collect())
    }

    fn store_executed(
        &mut self,
        _session: &mut dyn Session,
        entry: &JournalEntry,
    ) -> ratchet_journal::Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.fail_journal_writes {
            return Err(JournalError::Target(TargetError::Rejected(
                "journal write refused".into(),
            )));
        }
        if self
            .comparer
            .contains(state.visible_journal(), &entry.script_name)
        {
            return Ok(());
        }
        match state.pending.as_mut() {
            Some(pending) if self.transactional => pending.journal.push(entry.script_name.clone()),
            _ => state.journal.push(entry.script_name.clone()),
        }
        Ok(())
    }

    fn ensure_ready(&mut self, _session: &mut dyn Session) -> ratchet_journal::Result<()> {
        Ok(())
    }

    fn is_transactional(&self) -> bool {
        self.transactional
    }

    fn set_comparer(&mut self, comparer: NameComparer) {
        self.comparer = comparer;
    }
}

type ScriptFactory = Box<dyn Fn() -> Result<Vec<Script>, ProviderError> + Send + Sync>;

/// Provider backed by a closure, called afresh on every enumeration.
pub struct FnProvider {
    label: String,
    factory: ScriptFactory,
}

impl FnProvider {
    /// Provider returning whatever `factory` builds.
    pub fn new<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Vec<Script> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            factory: Box::new(move || Ok(factory())),
        }
    }

    /// Provider whose enumeration always fails.
    pub fn failing(label: impl Into<String>, message: impl Into<String>) -> Self {
        let label = label.into();
        let message = message.into();
        let path = std::path::PathBuf::from(&label);
        Self {
            label,
            factory: Box::new(move || {
                Err(ProviderError::Walk {
                    path: path.clone(),
                    message: message.clone(),
                })
            }),
        }
    }

    /// Provider of inline run-once scripts built from `(name, body)` pairs.
    pub fn inline(label: impl Into<String>, scripts: &[(&str, &str)]) -> Self {
        Self::with_options(label, ScriptOptions::default(), scripts)
    }

    /// Provider of inline scripts sharing `options`.
    pub fn with_options(
        label: impl Into<String>,
        options: ScriptOptions,
        scripts: &[(&str, &str)],
    ) -> Self {
        let owned: Vec<(String, String)> = scripts
            .iter()
            .map(|(name, body)| ((*name).to_owned(), (*body).to_owned()))
            .collect();
        Self::new(label, move || {
            owned
                .iter()
                .map(|(name, body)| Script::with_options(name.clone(), options, body.clone()))
                .collect()
        })
    }
}

impl ScriptProvider for FnProvider {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn get_scripts(&self, _session: &mut dyn Session) -> Result<Vec<Script>, ProviderError> {
        (self.factory)()
    }
}

/// Records which deferred scripts were materialised.
#[derive(Debug, Clone, Default)]
pub struct MaterializationLog {
    names: Arc<Mutex<Vec<String>>>,
}

impl MaterializationLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deferred script that notes its name here when materialised.
    pub fn script(&self, name: &str, options: ScriptOptions, body: &str) -> Script {
        let names = Arc::clone(&self.names);
        let recorded = name.to_owned();
        let body = body.to_owned();
        Script::deferred(name, options, move |_session| {
            names.lock().push(recorded);
            Ok(body)
        })
    }

    /// Provider emitting tracked run-once scripts for `(name, body)` pairs.
    pub fn provider(&self, label: &str, scripts: &[(&str, &str)]) -> FnProvider {
        let log = self.clone();
        let owned: Vec<(String, String)> = scripts
            .iter()
            .map(|(name, body)| ((*name).to_owned(), (*body).to_owned()))
            .collect();
        FnProvider::new(label, move || {
            owned
                .iter()
                .map(|(name, body)| log.script(name, ScriptOptions::default(), body))
                .collect()
        })
    }

    /// Names materialised so far, in order.
    pub fn materialized(&self) -> Vec<String> {
        self.names.lock().clone()
    }
}
