//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script model and collaborator contracts for the upgrade engine."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! Core building blocks shared by every Ratchet crate.
//!
//! A [`Script`] is a named, lazily materialised unit of change. Providers
//! enumerate scripts, a [`NameComparer`] decides identity and ordering, a
//! [`ScriptFilter`] removes what the journal already holds, and a
//! [`Session`] is the only handle the engine and code scripts have on the
//! target datastore.
#![warn(missing_docs)]

pub mod comparer;
pub mod error;
pub mod filter;
pub mod policy;
pub mod preprocess;
pub mod provider;
pub mod script;
pub mod session;

pub use comparer::{CaseSensitivity, NameComparer};
pub use error::{BoxError, ProviderError, ScriptError, TargetError};
pub use filter::{
    DefaultScriptFilter, NamedSubsetFilter, RerunAllFilter, ScriptFilter, WatermarkFilter,
};
pub use policy::{FailurePolicy, TransactionMode};
pub use preprocess::{ScriptPreprocessor, VariableSubstitution};
pub use provider::{accept_all, NamePredicate, ScriptProvider};
pub use script::{
    order_scripts, Script, ScriptDescriptor, ScriptOptions, ScriptType, DEFAULT_RUN_ORDER,
};
pub use session::Session;
