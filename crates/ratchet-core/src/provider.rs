//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script provider contract."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::sync::Arc;

use crate::error::ProviderError;
use crate::script::Script;
use crate::session::Session;

/// Name predicate supplied to providers at construction.
pub type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate accepting every script name.
pub fn accept_all() -> NamePredicate {
    Arc::new(|_| true)
}

/// Source of scripts.
///
/// Implementations return the same name set for the same source state but
/// may emit in any order. Enumeration must not execute anything; the session
/// is only handed over so deferred scripts can capture what they need.
pub trait ScriptProvider {
    /// Short label used in logs and error messages.
    fn describe(&self) -> String;

    /// Enumerate available scripts.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the source cannot be enumerated.
    fn get_scripts(&self, session: &mut dyn Session) -> Result<Vec<Script>, ProviderError>;
}
