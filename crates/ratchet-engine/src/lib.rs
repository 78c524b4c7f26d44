//! ---
//! ratchet_section: "07-orchestration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Upgrade orchestration crate root."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! Upgrade orchestration.
//!
//! [`UpgradeEngine`] gathers scripts from its providers, orders them by
//! `(run_order, name)`, asks the filter which run-once scripts are still
//! pending and executes them through a caller-owned
//! [`Session`](ratchet_core::Session), journaling each success. Pre-execution
//! problems surface as [`UpgradeError`]; everything after that lands in the
//! [`RunReport`].
#![warn(missing_docs)]

pub mod cancel;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;

pub use cancel::CancellationToken;
pub use engine::{UpgradeEngine, UpgradeEngineBuilder};
pub use error::UpgradeError;
pub use metrics::UpgradeMetrics;
pub use report::{
    Outcome, RunError, RunReport, RunStatus, ScriptFailure, ScriptResult, SkipReason,
    TransactionOutcome,
};
