//! ---
//! ratchet_section: "03-journal-persistence"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Journal that records nothing."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use ratchet_core::Session;

use crate::{Journal, JournalEntry, Result};

/// Forgets everything, so every script runs on every invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn describe(&self) -> String {
        "null".to_owned()
    }

    fn executed_scripts(&mut self, _session: &mut dyn Session) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    fn store_executed(&mut self, _session: &mut dyn Session, _entry: &JournalEntry) -> Result<()> {
        Ok(())
    }

    fn ensure_ready(&mut self, _session: &mut dyn Session) -> Result<()> {
        Ok(())
    }
}
