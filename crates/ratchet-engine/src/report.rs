//! ---
//! ratchet_section: "07-orchestration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Run report returned by the engine."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ratchet_core::{ScriptDescriptor, ScriptError, ScriptType, TargetError, TransactionMode};
use ratchet_journal::JournalError;
use serde::{Serialize, Serializer};
use serde_with::{serde_as, DurationMilliSeconds};
use uuid::Uuid;

/// What happened to one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Executed successfully (and journaled if run-once).
    Applied,
    /// Not executed; see [`SkipReason`].
    Skipped,
    /// Execution was attempted and failed; see [`ScriptFailure`].
    Failed,
}

impl Outcome {
    /// Stable label for logs and rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }
}

/// Why a script was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The journal already records it.
    AlreadyExecuted,
    /// The filter left it out although it is not journaled.
    NotSelected,
    /// An earlier failure stopped the run.
    Aborted,
    /// The run was cancelled before it started.
    Cancelled,
}

impl SkipReason {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyExecuted => "already-executed",
            SkipReason::NotSelected => "not-selected",
            SkipReason::Aborted => "aborted",
            SkipReason::Cancelled => "cancelled",
        }
    }
}

/// Failure of a single script, keeping the original error.
#[derive(Debug, thiserror::Error)]
pub enum ScriptFailure {
    /// Content could not be produced or preprocessed.
    #[error("materialisation failed: {0}")]
    Materialize(#[source] ScriptError),
    /// The target rejected the script.
    #[error("execution failed: {0}")]
    Execute(#[source] TargetError),
    /// The script ran but could not be journaled.
    #[error("journal write failed: {0}")]
    Journal(#[source] JournalError),
    /// Opening or committing the script's transaction failed.
    #[error("transaction control failed: {0}")]
    Transaction(#[source] TargetError),
}

impl ScriptFailure {
    /// Stage label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            ScriptFailure::Materialize(_) => "materialize",
            ScriptFailure::Execute(_) => "execute",
            ScriptFailure::Journal(_) => "journal",
            ScriptFailure::Transaction(_) => "transaction",
        }
    }
}

/// Result line for one script, in execution order.
#[serde_as]
#[derive(Debug, Serialize)]
pub struct ScriptResult {
    /// Journal key.
    pub name: String,
    /// Journal behaviour.
    pub script_type: ScriptType,
    /// Execution group.
    pub run_order: i32,
    /// Applied, skipped or failed.
    pub outcome: Outcome,
    /// Set when `outcome` is [`Outcome::Skipped`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Set when `outcome` is [`Outcome::Failed`].
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "display_option"
    )]
    pub failure: Option<ScriptFailure>,
    /// Wall time spent on the script, when it was attempted.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl ScriptResult {
    pub(crate) fn applied(descriptor: ScriptDescriptor, duration: Duration) -> Self {
        Self::new(descriptor, Outcome::Applied, None, None, Some(duration))
    }

    pub(crate) fn skipped(descriptor: ScriptDescriptor, reason: SkipReason) -> Self {
        Self::new(descriptor, Outcome::Skipped, Some(reason), None, None)
    }

    pub(crate) fn failed(
        descriptor: ScriptDescriptor,
        failure: ScriptFailure,
        duration: Duration,
    ) -> Self {
        Self::new(descriptor, Outcome::Failed, None, Some(failure), Some(duration))
    }

    fn new(
        descriptor: ScriptDescriptor,
        outcome: Outcome,
        skip_reason: Option<SkipReason>,
        failure: Option<ScriptFailure>,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            name: descriptor.name,
            script_type: descriptor.script_type,
            run_order: descriptor.run_order,
            outcome,
            skip_reason,
            failure,
            duration,
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Every attempted script was applied and finalisation succeeded.
    Succeeded,
    /// At least one script or the final commit failed.
    Failed,
    /// The run stopped early on request.
    Cancelled,
}

impl RunStatus {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

/// Fate of the run-wide transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionOutcome {
    /// No run-wide transaction was used.
    NotApplicable,
    /// The run-wide transaction committed.
    Committed,
    /// The run-wide transaction was rolled back; nothing persisted.
    RolledBack,
}

/// Problem finalising a run after its scripts were processed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Committing the run-wide transaction failed.
    #[error("commit failed: {0}")]
    Commit(#[source] TargetError),
    /// Rolling back failed; the target state is unknown.
    #[error("rollback failed: {0}")]
    Rollback(#[source] TargetError),
    /// A buffered journal entry could not be written after commit.
    #[error("journal flush failed for `{script}`: {source}")]
    JournalFlush {
        /// Script whose entry was lost.
        script: String,
        /// Underlying journal failure.
        #[source]
        source: JournalError,
    },
}

/// Aggregate result of one `perform_upgrade` call. Terminal once returned.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Unique id of the run, also attached to its log events.
    pub run_id: Uuid,
    /// When gathering started.
    pub started_at: DateTime<Utc>,
    /// When the report was sealed.
    pub finished_at: DateTime<Utc>,
    /// Atomicity the run used.
    pub transaction_mode: TransactionMode,
    /// Terminal state.
    pub status: RunStatus,
    /// Run-wide transaction fate.
    pub transaction: TransactionOutcome,
    /// One entry per gathered script in execution order.
    pub results: Vec<ScriptResult>,
    /// Finalisation problems.
    #[serde(serialize_with = "display_all")]
    pub run_errors: Vec<RunError>,
}

impl RunReport {
    /// Whether the run succeeded.
    pub fn successful(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Results with the given outcome.
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &ScriptResult> {
        self.results.iter().filter(move |r| r.outcome == outcome)
    }

    /// Names of applied scripts, in order.
    pub fn applied(&self) -> Vec<&str> {
        self.with_outcome(Outcome::Applied)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Names of applied scripts whose effects were kept.
    pub fn persisted(&self) -> Vec<&str> {
        if self.transaction == TransactionOutcome::RolledBack {
            return Vec::new();
        }
        self.applied()
    }

    /// Names skipped for `reason`, in order.
    pub fn skipped(&self, reason: SkipReason) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.skip_reason == Some(reason))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// First failed script, if any.
    pub fn first_failure(&self) -> Option<&ScriptResult> {
        self.with_outcome(Outcome::Failed).next()
    }

    /// Look up the result for `name` (exact match).
    pub fn result(&self, name: &str) -> Option<&ScriptResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |outcome| self.with_outcome(outcome).count();
        write!(
            f,
            "run {} {:?}: {} applied, {} skipped, {} failed",
            self.run_id,
            self.status,
            count(Outcome::Applied),
            count(Outcome::Skipped),
            count(Outcome::Failed)
        )?;
        if self.transaction != TransactionOutcome::NotApplicable {
            write!(f, " (transaction {:?})", self.transaction)?;
        }
        Ok(())
    }
}

fn display_option<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

fn display_all<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_seq(values.iter().map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_core::ScriptOptions;

    fn descriptor(name: &str) -> ScriptDescriptor {
        ratchet_core::Script::with_options(name, ScriptOptions::default(), "").descriptor()
    }

    fn report(transaction: TransactionOutcome) -> RunReport {
        RunReport {
            run_id: Uuid::nil(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            transaction_mode: TransactionMode::Single,
            status: RunStatus::Failed,
            transaction,
            results: vec![
                ScriptResult::applied(descriptor("001.sql"), Duration::from_millis(3)),
                ScriptResult::failed(
                    descriptor("002.sql"),
                    ScriptFailure::Execute(TargetError::Rejected("syntax error".into())),
                    Duration::from_millis(1),
                ),
                ScriptResult::skipped(descriptor("003.sql"), SkipReason::Aborted),
            ],
            run_errors: Vec::new(),
        }
    }

    #[test]
    fn accessors_summarise_outcomes() {
        let report = report(TransactionOutcome::RolledBack);
        assert_eq!(report.applied(), vec!["001.sql"]);
        assert!(report.persisted().is_empty());
        assert_eq!(report.skipped(SkipReason::Aborted), vec!["003.sql"]);
        assert_eq!(report.first_failure().unwrap().name, "002.sql");
        assert_eq!(
            report.result("002.sql").unwrap().failure.as_ref().unwrap().stage(),
            "execute"
        );
        assert!(report.to_string().contains("1 applied, 1 skipped, 1 failed"));
    }

    #[test]
    fn serialises_failures_as_text() {
        let json = serde_json::to_value(report(TransactionOutcome::Committed)).unwrap();
        assert_eq!(json["results"][0]["outcome"], "applied");
        assert_eq!(json["results"][0]["duration_ms"], 3);
        assert!(json["results"][1]["failure"]
            .as_str()
            .unwrap()
            .contains("syntax error"));
        assert_eq!(json["results"][2]["skip_reason"], "aborted");
        assert_eq!(json["transaction"], "committed");
    }
}
