//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Transaction and failure policies applied by the engine."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Atomicity granularity of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    /// Statements apply immediately; a failure leaves partial effects.
    None,
    /// Each script and its journal entry commit or roll back together.
    #[default]
    PerScript,
    /// The whole run commits or rolls back as one unit.
    Single,
    /// Like [`TransactionMode::Single`] but always rolls back.
    SingleAlwaysRollback,
}

impl TransactionMode {
    /// Whether one transaction spans the entire run.
    pub fn spans_run(&self) -> bool {
        matches!(
            self,
            TransactionMode::Single | TransactionMode::SingleAlwaysRollback
        )
    }

    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionMode::None => "none",
            TransactionMode::PerScript => "per-script",
            TransactionMode::Single => "single",
            TransactionMode::SingleAlwaysRollback => "single-always-rollback",
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens after a script fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the remaining scripts.
    #[default]
    StopOnFirstFailure,
    /// Record the failure and keep going.
    ContinueOnFailure,
}
