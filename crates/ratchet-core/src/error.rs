//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Error taxonomy shared by providers, scripts and target sessions."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::path::PathBuf;

/// Boxed error used by adapters wrapping driver-specific failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a [`Session`](crate::Session) while talking to the target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The target refused the command (syntax error, constraint violation, ...).
    #[error("command rejected by target: {0}")]
    Rejected(String),
    /// Transaction control was used out of sequence or failed.
    #[error("transaction control failed: {0}")]
    Transaction(String),
    /// Failure surfaced by the underlying driver.
    #[error("target backend error: {0}")]
    Backend(#[source] BoxError),
}

impl TargetError {
    /// Wrap a driver error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Backend(err.into())
    }
}

/// Failure while turning a script descriptor into executable text.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// File-backed script could not be read.
    #[error("unable to read script file {path}: {source}")]
    Read {
        /// Path of the script file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// File-backed script is not valid UTF-8.
    #[error("script file {0} is not valid UTF-8")]
    Encoding(PathBuf),
    /// A code script refused to produce its body.
    #[error("script generation failed: {0}")]
    Generate(String),
    /// A code script issued a command against the target that failed.
    #[error("script generation query failed: {0}")]
    Target(#[from] TargetError),
    /// Variable substitution found a token without a value.
    #[error("variable `{0}` has no value defined")]
    UndefinedVariable(String),
}

/// Failure while enumerating scripts from a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Configured script directory is missing.
    #[error("script directory {0} does not exist")]
    MissingDirectory(PathBuf),
    /// Directory traversal failed part way.
    #[error("failed to enumerate scripts under {path}: {message}")]
    Walk {
        /// Root being walked.
        path: PathBuf,
        /// Description of the traversal failure.
        message: String,
    },
    /// A provider needed the target during enumeration and it failed.
    #[error("provider query failed: {0}")]
    Target(#[from] TargetError),
}
