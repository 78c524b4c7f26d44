//! ---
//! ratchet_section: "07-orchestration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Errors that prevent a run from executing."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use ratchet_core::{ProviderError, TargetError};
use ratchet_journal::JournalError;

/// Errors raised before any script executes, or by maintenance operations.
///
/// Failures during execution are reported through
/// [`RunReport`](crate::RunReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// The engine has nothing to read scripts from.
    #[error("no script providers configured")]
    NoProviders,
    /// Two gathered scripts share a name under the active comparer.
    #[error("duplicate script name `{second}` collides with `{first}`")]
    DuplicateScript {
        /// Name seen first.
        first: String,
        /// Colliding name.
        second: String,
    },
    /// A provider could not enumerate its scripts.
    #[error("script provider {provider} failed: {source}")]
    Provider {
        /// Provider description.
        provider: String,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },
    /// The journal could not be read.
    #[error("unable to read journal: {0}")]
    JournalRead(#[source] JournalError),
    /// The journal could not be written outside of a normal run.
    #[error("unable to write journal: {0}")]
    JournalWrite(#[source] JournalError),
    /// Opening or finishing a maintenance or run-wide transaction failed.
    #[error("transaction control failed: {0}")]
    Transaction(#[source] TargetError),
}

impl UpgradeError {
    /// Whether the error stems from how the engine was assembled.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            UpgradeError::NoProviders | UpgradeError::DuplicateScript { .. }
        )
    }
}
