//! ---
//! ratchet_section: "07-orchestration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Upgrade engine: plan, execute, journal and finalise a run."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use chrono::Utc;
use ratchet_core::{
    order_scripts, DefaultScriptFilter, FailurePolicy, NameComparer, Script, ScriptDescriptor,
    ScriptError, ScriptFilter, ScriptPreprocessor, ScriptProvider, ScriptType, Session,
    TransactionMode, VariableSubstitution,
};
use ratchet_journal::{Journal, JournalEntry, TableJournal};
use ratchet_logging::{
    log_run_event, ratchet_debug, ratchet_error, ratchet_info, ratchet_warn, LogContext,
    RunEventOutcome,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::error::UpgradeError;
use crate::metrics::UpgradeMetrics;
use crate::report::{
    RunError, RunReport, RunStatus, ScriptFailure, ScriptResult, SkipReason, TransactionOutcome,
};

/// Lifecycle of a single run. Every call starts from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    Gathering,
    Ordering,
    Filtering,
    Executing(usize),
    Succeeded,
    Failed,
}

struct RunTracker<'a> {
    run_id: &'a str,
    phase: RunPhase,
}

impl<'a> RunTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            phase: RunPhase::Idle,
        }
    }

    fn advance(&mut self, next: RunPhase) {
        ratchet_debug!(
            context = LogContext::new().with_run(self.run_id),
            "run phase {:?} -> {:?}",
            self.phase,
            next
        );
        self.phase = next;
    }
}

/// When a run-once script's journal entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JournalTiming {
    /// Right after execution, inside whatever transaction is open.
    WithScript,
    /// After the script's own transaction committed.
    AfterScriptCommit,
    /// Buffered until the run-wide transaction committed.
    AfterRunCommit,
}

enum PlanEntry {
    Execute(Script),
    Skip(ScriptDescriptor, SkipReason),
}

/// Assembles an [`UpgradeEngine`].
///
/// Only providers are mandatory. The journal defaults to a
/// [`TableJournal`] and the filter to [`DefaultScriptFilter`]. Whatever
/// journal is used matches names with the builder's comparer.
pub struct UpgradeEngineBuilder {
    providers: Vec<Box<dyn ScriptProvider>>,
    journal: Option<Box<dyn Journal>>,
    filter: Box<dyn ScriptFilter>,
    preprocessors: Vec<Box<dyn ScriptPreprocessor>>,
    comparer: NameComparer,
    transaction_mode: TransactionMode,
    failure_policy: FailurePolicy,
    metrics: Option<UpgradeMetrics>,
    cancellation: Option<CancellationToken>,
}

impl Default for UpgradeEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeEngineBuilder {
    /// Empty builder with default policies.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            journal: None,
            filter: Box::new(DefaultScriptFilter),
            preprocessors: Vec::new(),
            comparer: NameComparer::default(),
            transaction_mode: TransactionMode::default(),
            failure_policy: FailurePolicy::default(),
            metrics: None,
            cancellation: None,
        }
    }

    /// Add a script source. Sources are gathered in registration order.
    pub fn with_provider(self, provider: impl ScriptProvider + 'static) -> Self {
        self.with_boxed_provider(Box::new(provider))
    }

    /// Add an already boxed script source.
    pub fn with_boxed_provider(mut self, provider: Box<dyn ScriptProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Use `journal` to track applied scripts.
    pub fn with_journal(self, journal: impl Journal + 'static) -> Self {
        self.with_boxed_journal(Box::new(journal))
    }

    /// Use an already boxed journal.
    pub fn with_boxed_journal(mut self, journal: Box<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Replace the script selection strategy.
    pub fn with_filter(mut self, filter: impl ScriptFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Append a content preprocessor. Preprocessors run in registration order.
    pub fn with_preprocessor(mut self, preprocessor: impl ScriptPreprocessor + 'static) -> Self {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Substitute `$name$` tokens from `variables`.
    ///
    /// Unknown tokens fail the script when `strict` is set and are left in
    /// place otherwise.
    pub fn with_variables<I, K, V>(self, variables: I, strict: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let substitution = VariableSubstitution::new(variables);
        if strict {
            self.with_preprocessor(substitution)
        } else {
            self.with_preprocessor(substitution.lenient())
        }
    }

    /// Name ordering and equality policy.
    pub fn with_comparer(mut self, comparer: NameComparer) -> Self {
        self.comparer = comparer;
        self
    }

    /// Atomicity of the run.
    pub fn with_transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.transaction_mode = mode;
        self
    }

    /// Behaviour after a script fails.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Publish run metrics.
    pub fn with_metrics(mut self, metrics: UpgradeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Observe `token` between scripts.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Finish assembly.
    ///
    /// The journal is switched to the builder's comparer, whichever journal
    /// was supplied.
    pub fn build(self) -> UpgradeEngine {
        let comparer = self.comparer;
        let mut journal = self
            .journal
            .unwrap_or_else(|| Box::new(TableJournal::new()) as Box<dyn Journal>);
        journal.set_comparer(comparer);
        UpgradeEngine {
            providers: self.providers,
            journal,
            filter: self.filter,
            preprocessors: self.preprocessors,
            comparer,
            transaction_mode: self.transaction_mode,
            failure_policy: self.failure_policy,
            metrics: self.metrics,
            cancellation: self.cancellation,
        }
    }
}

/// Applies pending scripts to a target through a caller-owned session.
///
/// The engine holds no per-run state between calls; each
/// [`perform_upgrade`](Self::perform_upgrade) gathers, orders and filters
/// afresh against the current journal contents.
pub struct UpgradeEngine {
    providers: Vec<Box<dyn ScriptProvider>>,
    journal: Box<dyn Journal>,
    filter: Box<dyn ScriptFilter>,
    preprocessors: Vec<Box<dyn ScriptPreprocessor>>,
    comparer: NameComparer,
    transaction_mode: TransactionMode,
    failure_policy: FailurePolicy,
    metrics: Option<UpgradeMetrics>,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for UpgradeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeEngine")
            .field("providers", &self.providers.len())
            .field("journal", &self.journal.describe())
            .field("comparer", &self.comparer)
            .field("transaction_mode", &self.transaction_mode)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl UpgradeEngine {
    /// Start assembling an engine.
    pub fn builder() -> UpgradeEngineBuilder {
        UpgradeEngineBuilder::new()
    }

    /// Active name comparer.
    pub fn comparer(&self) -> NameComparer {
        self.comparer
    }

    /// Active transaction mode.
    pub fn transaction_mode(&self) -> TransactionMode {
        self.transaction_mode
    }

    /// Active failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Description of the configured journal.
    pub fn journal_description(&self) -> String {
        self.journal.describe()
    }

    /// Apply every pending script.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError`] only when the run could not start: no
    /// providers, a provider or journal read failure, duplicate names, or a
    /// run-wide transaction that could not be opened. Nothing has been
    /// executed in that case. Script failures are reported in the
    /// returned [`RunReport`].
    pub fn perform_upgrade(&mut self, session: &mut dyn Session) -> Result<RunReport, UpgradeError> {
        let run_id = Uuid::new_v4();
        let run_label = run_id.to_string();
        let mode = self.transaction_mode;
        let started_at = Utc::now();
        let ctx = LogContext::new()
            .with_run(&run_label)
            .with_mode(mode.as_str());
        let mut tracker = RunTracker::new(&run_label);

        log_run_event(
            Some(&ctx),
            "upgrade.started",
            &format!(
                "upgrading {} with journal {}",
                session.describe(),
                self.journal.describe()
            ),
            RunEventOutcome::Success,
        );

        let plan = match self.plan(session, &mut tracker) {
            Ok(plan) => plan,
            Err(err) => return Err(self.abort(&ctx, &mut tracker, err)),
        };
        if mode.spans_run() {
            if let Err(err) = session.begin() {
                return Err(self.abort(&ctx, &mut tracker, UpgradeError::Transaction(err)));
            }
        }

        let mut results = Vec::with_capacity(plan.len());
        let mut pending = Vec::new();
        let mut failed = false;
        let mut halt: Option<SkipReason> = None;

        for (index, entry) in plan.into_iter().enumerate() {
            let script = match entry {
                PlanEntry::Execute(script) => script,
                PlanEntry::Skip(descriptor, reason) => {
                    results.push(self.skip(descriptor, reason));
                    continue;
                }
            };
            if halt.is_none()
                && self
                    .cancellation
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled)
            {
                ratchet_warn!(
                    context = ctx,
                    "cancellation requested; remaining scripts will not run"
                );
                halt = Some(SkipReason::Cancelled);
            }
            if let Some(reason) = halt {
                results.push(self.skip(script.descriptor(), reason));
                continue;
            }

            tracker.advance(RunPhase::Executing(index));
            let descriptor = script.descriptor();
            let name = descriptor.name.clone();
            let script_ctx = ctx
                .clone()
                .with_script(&name)
                .with_run_order(descriptor.run_order);
            let started = Instant::now();
            match self.execute_script(session, script, &mut pending) {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    ratchet_info!(
                        context = script_ctx,
                        "applied {} in {} ms",
                        name,
                        elapsed.as_millis()
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_applied(
                            descriptor.script_type.as_str(),
                            elapsed.as_secs_f64(),
                        );
                    }
                    results.push(ScriptResult::applied(descriptor, elapsed));
                }
                Err(failure) => {
                    let elapsed = started.elapsed();
                    ratchet_error!(
                        context = script_ctx,
                        "script {} failed during {}: {}",
                        name,
                        failure.stage(),
                        failure
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_failed(descriptor.script_type.as_str(), failure.stage());
                    }
                    failed = true;
                    let journal_lost = matches!(failure, ScriptFailure::Journal(_));
                    if journal_lost || self.failure_policy == FailurePolicy::StopOnFirstFailure {
                        halt = Some(SkipReason::Aborted);
                    }
                    results.push(ScriptResult::failed(descriptor, failure, elapsed));
                }
            }
        }

        let cancelled = halt == Some(SkipReason::Cancelled);
        let mut run_errors = Vec::new();
        let transaction = if mode.spans_run() {
            self.finish_run(session, failed || cancelled, pending, &mut run_errors)
        } else {
            TransactionOutcome::NotApplicable
        };

        let status = if failed || !run_errors.is_empty() {
            RunStatus::Failed
        } else if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Succeeded
        };
        tracker.advance(if status == RunStatus::Succeeded {
            RunPhase::Succeeded
        } else {
            RunPhase::Failed
        });

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            transaction_mode: mode,
            status,
            transaction,
            results,
            run_errors,
        };
        for err in &report.run_errors {
            ratchet_error!(context = ctx, "run finalisation: {}", err);
        }
        let outcome = match status {
            RunStatus::Succeeded => RunEventOutcome::Success,
            RunStatus::Cancelled => RunEventOutcome::Degraded,
            RunStatus::Failed => RunEventOutcome::Fault,
        };
        log_run_event(
            Some(&ctx),
            "upgrade.finished",
            &report.to_string(),
            outcome,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run(status.as_str());
        }
        Ok(report)
    }

    /// Scripts the next run would execute, in order, without executing or
    /// materialising anything.
    ///
    /// # Errors
    ///
    /// Same pre-execution errors as [`perform_upgrade`](Self::perform_upgrade).
    pub fn scripts_to_execute(
        &mut self,
        session: &mut dyn Session,
    ) -> Result<Vec<ScriptDescriptor>, UpgradeError> {
        let mut tracker = RunTracker::new("preview");
        let plan = self.plan(session, &mut tracker)?;
        Ok(plan
            .into_iter()
            .filter_map(|entry| match entry {
                PlanEntry::Execute(script) => Some(script.descriptor()),
                PlanEntry::Skip(..) => None,
            })
            .collect())
    }

    /// Names recorded in the journal.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::JournalRead`] when the journal cannot be read.
    pub fn executed_scripts(
        &mut self,
        session: &mut dyn Session,
    ) -> Result<BTreeSet<String>, UpgradeError> {
        self.journal
            .executed_scripts(session)
            .map_err(UpgradeError::JournalRead)
    }

    /// Whether a run would execute anything.
    ///
    /// Run-always scripts are always pending, so any configured run-always
    /// script makes this return `true`.
    ///
    /// # Errors
    ///
    /// Same as [`scripts_to_execute`](Self::scripts_to_execute).
    pub fn is_upgrade_required(&mut self, session: &mut dyn Session) -> Result<bool, UpgradeError> {
        Ok(!self.scripts_to_execute(session)?.is_empty())
    }

    /// Journal every pending run-once script without executing it.
    ///
    /// Returns the pending names, in execution order. Writes to a
    /// transactional journal are wrapped in one transaction unless the mode
    /// is [`TransactionMode::None`]; under
    /// [`TransactionMode::SingleAlwaysRollback`] that transaction is rolled
    /// back. A non-transactional journal is written directly, and not at all
    /// under [`TransactionMode::SingleAlwaysRollback`].
    ///
    /// # Errors
    ///
    /// Pre-execution errors as for [`perform_upgrade`](Self::perform_upgrade),
    /// plus [`UpgradeError::JournalWrite`] and [`UpgradeError::Transaction`].
    /// On error no entry is kept when the journal is transactional.
    pub fn mark_as_executed(
        &mut self,
        session: &mut dyn Session,
    ) -> Result<Vec<String>, UpgradeError> {
        let mut tracker = RunTracker::new("mark-as-executed");
        let names: Vec<String> = self
            .plan(session, &mut tracker)?
            .into_iter()
            .filter_map(|entry| match entry {
                PlanEntry::Execute(script) if script.script_type() == ScriptType::RunOnce => {
                    Some(script.name().to_owned())
                }
                _ => None,
            })
            .collect();
        if names.is_empty() {
            return Ok(names);
        }

        if !self.journal.is_transactional() {
            // Rollback cannot undo these writes, so a dry run writes nothing.
            if self.transaction_mode == TransactionMode::SingleAlwaysRollback {
                info!(count = names.len(), journal = %self.journal.describe(), "dry run; nothing marked");
                return Ok(names);
            }
            self.write_entries(session, &names)
                .map_err(UpgradeError::JournalWrite)?;
            info!(count = names.len(), journal = %self.journal.describe(), "scripts marked as executed");
            return Ok(names);
        }

        let wrapped = self.transaction_mode != TransactionMode::None;
        if wrapped {
            session.begin().map_err(UpgradeError::Transaction)?;
        }
        if let Err(err) = self.write_entries(session, &names) {
            if wrapped {
                rollback_quietly(session);
            }
            return Err(UpgradeError::JournalWrite(err));
        }
        if wrapped {
            let finished = if self.transaction_mode == TransactionMode::SingleAlwaysRollback {
                session.rollback()
            } else {
                session.commit()
            };
            if let Err(err) = finished {
                rollback_quietly(session);
                return Err(UpgradeError::Transaction(err));
            }
        }
        info!(count = names.len(), journal = %self.journal.describe(), "scripts marked as executed");
        Ok(names)
    }

    fn abort(
        &self,
        ctx: &LogContext<'_>,
        tracker: &mut RunTracker<'_>,
        err: UpgradeError,
    ) -> UpgradeError {
        tracker.advance(RunPhase::Failed);
        log_run_event(
            Some(ctx),
            "upgrade.aborted",
            &err.to_string(),
            RunEventOutcome::Fault,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run(RunStatus::Failed.as_str());
        }
        err
    }

    fn plan(
        &mut self,
        session: &mut dyn Session,
        tracker: &mut RunTracker<'_>,
    ) -> Result<Vec<PlanEntry>, UpgradeError> {
        tracker.advance(RunPhase::Gathering);
        let mut scripts = self.gather(session)?;
        tracker.advance(RunPhase::Ordering);
        order_scripts(&mut scripts, &self.comparer);
        tracker.advance(RunPhase::Filtering);
        let executed = self
            .journal
            .executed_scripts(session)
            .map_err(UpgradeError::JournalRead)?;
        debug!(
            gathered = scripts.len(),
            journaled = executed.len(),
            "selecting scripts"
        );
        Ok(self.select(scripts, &executed))
    }

    fn gather(&self, session: &mut dyn Session) -> Result<Vec<Script>, UpgradeError> {
        if self.providers.is_empty() {
            return Err(UpgradeError::NoProviders);
        }
        let mut scripts = Vec::new();
        for provider in &self.providers {
            let mut provided =
                provider
                    .get_scripts(session)
                    .map_err(|source| UpgradeError::Provider {
                        provider: provider.describe(),
                        source,
                    })?;
            debug!(provider = %provider.describe(), count = provided.len(), "scripts gathered");
            scripts.append(&mut provided);
        }

        let mut seen: HashMap<String, String> = HashMap::with_capacity(scripts.len());
        for script in &scripts {
            match seen.entry(self.comparer.key(script.name()).into_owned()) {
                Entry::Occupied(first) => {
                    return Err(UpgradeError::DuplicateScript {
                        first: first.get().clone(),
                        second: script.name().to_owned(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(script.name().to_owned());
                }
            }
        }
        Ok(scripts)
    }

    /// Run-once scripts go through the filter; run-always scripts bypass it.
    /// Order is preserved whatever the filter returns.
    fn select(&self, scripts: Vec<Script>, executed: &BTreeSet<String>) -> Vec<PlanEntry> {
        let mut descriptors = Vec::with_capacity(scripts.len());
        let mut slots: Vec<Option<Script>> = Vec::with_capacity(scripts.len());
        let mut positions = HashMap::new();
        let mut candidates = Vec::new();

        for (index, script) in scripts.into_iter().enumerate() {
            descriptors.push(script.descriptor());
            match script.script_type() {
                ScriptType::RunAlways => slots.push(Some(script)),
                ScriptType::RunOnce => {
                    positions.insert(self.comparer.key(script.name()).into_owned(), index);
                    candidates.push(script);
                    slots.push(None);
                }
            }
        }

        for script in self.filter.filter(candidates, executed, &self.comparer) {
            match positions.get(self.comparer.key(script.name()).as_ref()) {
                Some(&index) => slots[index] = Some(script),
                None => warn!(script = %script.name(), "filter returned an unknown script; ignored"),
            }
        }

        let executed_keys = self.comparer.key_set(executed);
        descriptors
            .into_iter()
            .zip(slots)
            .map(|(descriptor, slot)| match slot {
                Some(script) => PlanEntry::Execute(script),
                None => {
                    let reason =
                        if executed_keys.contains(self.comparer.key(&descriptor.name).as_ref()) {
                            SkipReason::AlreadyExecuted
                        } else {
                            SkipReason::NotSelected
                        };
                    PlanEntry::Skip(descriptor, reason)
                }
            })
            .collect()
    }

    fn journal_timing(&self) -> JournalTiming {
        if self.transaction_mode == TransactionMode::None || self.journal.is_transactional() {
            JournalTiming::WithScript
        } else if self.transaction_mode == TransactionMode::PerScript {
            JournalTiming::AfterScriptCommit
        } else {
            JournalTiming::AfterRunCommit
        }
    }

    fn execute_script(
        &mut self,
        session: &mut dyn Session,
        script: Script,
        pending: &mut Vec<JournalEntry>,
    ) -> Result<(), ScriptFailure> {
        let per_script = self.transaction_mode == TransactionMode::PerScript;
        let journaled = script.script_type() == ScriptType::RunOnce;
        let timing = self.journal_timing();
        let name = script.name().to_owned();

        if per_script {
            session.begin().map_err(ScriptFailure::Transaction)?;
        }
        let executed = self.run_script(session, script, journaled, timing, pending);
        if per_script {
            if let Err(failure) = executed {
                rollback_quietly(session);
                return Err(failure);
            }
            if let Err(err) = session.commit() {
                rollback_quietly(session);
                return Err(ScriptFailure::Transaction(err));
            }
        } else {
            executed?;
        }

        if journaled && timing == JournalTiming::AfterScriptCommit {
            self.write_journal(session, &JournalEntry::new(name))
                .map_err(ScriptFailure::Journal)?;
        }
        Ok(())
    }

    fn run_script(
        &mut self,
        session: &mut dyn Session,
        script: Script,
        journaled: bool,
        timing: JournalTiming,
        pending: &mut Vec<JournalEntry>,
    ) -> Result<(), ScriptFailure> {
        let name = script.name().to_owned();
        let content = script
            .materialize(session)
            .and_then(|content| self.preprocess(content))
            .map_err(ScriptFailure::Materialize)?;
        session.execute(&content).map_err(ScriptFailure::Execute)?;
        if journaled {
            let entry = JournalEntry::new(name);
            match timing {
                JournalTiming::WithScript => self
                    .write_journal(session, &entry)
                    .map_err(ScriptFailure::Journal)?,
                JournalTiming::AfterScriptCommit => {}
                JournalTiming::AfterRunCommit => pending.push(entry),
            }
        }
        Ok(())
    }

    fn preprocess(&self, content: String) -> Result<String, ScriptError> {
        self.preprocessors
            .iter()
            .try_fold(content, |content, preprocessor| preprocessor.process(&content))
    }

    fn write_journal(
        &mut self,
        session: &mut dyn Session,
        entry: &JournalEntry,
    ) -> ratchet_journal::Result<()> {
        self.journal.store_executed(session, entry)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_journal_write();
        }
        Ok(())
    }

    fn write_entries(
        &mut self,
        session: &mut dyn Session,
        names: &[String],
    ) -> ratchet_journal::Result<()> {
        self.journal.ensure_ready(session)?;
        for name in names {
            self.write_journal(session, &JournalEntry::new(name.as_str()))?;
        }
        Ok(())
    }

    /// Close the run-wide transaction and flush buffered journal entries.
    fn finish_run(
        &mut self,
        session: &mut dyn Session,
        abandon: bool,
        pending: Vec<JournalEntry>,
        run_errors: &mut Vec<RunError>,
    ) -> TransactionOutcome {
        if abandon || self.transaction_mode == TransactionMode::SingleAlwaysRollback {
            if let Err(err) = session.rollback() {
                run_errors.push(RunError::Rollback(err));
            }
            return TransactionOutcome::RolledBack;
        }
        if let Err(err) = session.commit() {
            run_errors.push(RunError::Commit(err));
            if let Err(err) = session.rollback() {
                run_errors.push(RunError::Rollback(err));
            }
            return TransactionOutcome::RolledBack;
        }
        for entry in pending {
            if let Err(source) = self.write_journal(session, &entry) {
                run_errors.push(RunError::JournalFlush {
                    script: entry.script_name,
                    source,
                });
            }
        }
        TransactionOutcome::Committed
    }

    fn skip(&self, descriptor: ScriptDescriptor, reason: SkipReason) -> ScriptResult {
        debug!(script = %descriptor.name, reason = reason.as_str(), "script skipped");
        if let Some(metrics) = &self.metrics {
            metrics.record_skipped(reason.as_str());
        }
        ScriptResult::skipped(descriptor, reason)
    }
}

fn rollback_quietly(session: &mut dyn Session) {
    if let Err(err) = session.rollback() {
        warn!(error = %err, session = %session.describe(), "rollback failed");
    }
}
