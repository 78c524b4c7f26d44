//! ---
//! ratchet_section: "05-observability"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Structured run logging context and lifecycle events."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Identifier of the upgrade run.
    pub run_id: Option<&'a str>,
    /// Script currently being processed.
    pub script: Option<&'a str>,
    /// Run-order group of that script.
    pub run_order: Option<i32>,
    /// Transaction mode of the run.
    pub mode: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the run identifier.
    pub fn with_run(mut self, run_id: &'a str) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Attach a script name.
    pub fn with_script(mut self, script: &'a str) -> Self {
        self.script = Some(script);
        self
    }

    /// Attach a run-order group.
    pub fn with_run_order(mut self, run_order: i32) -> Self {
        self.run_order = Some(run_order);
        self
    }

    /// Attach the transaction mode.
    pub fn with_mode(mut self, mode: &'a str) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Outcome attached to run lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEventOutcome {
    /// The step completed.
    Success,
    /// The step completed with something worth attention.
    Degraded,
    /// The step failed or was aborted.
    Fault,
}

impl RunEventOutcome {
    /// Stable label for the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEventOutcome::Success => "success",
            RunEventOutcome::Degraded => "degraded",
            RunEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized run lifecycle event.
pub fn log_run_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: RunEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    match outcome {
        RunEventOutcome::Success => ratchet_info!(
            context = ctx,
            "{event}: {message} (outcome={})",
            outcome.as_str()
        ),
        RunEventOutcome::Degraded => ratchet_warn!(
            context = ctx,
            "{event}: {message} (outcome={})",
            outcome.as_str()
        ),
        RunEventOutcome::Fault => ratchet_error!(
            context = ctx,
            "{event}: {message} (outcome={})",
            outcome.as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        let ctx = LogContext::new()
            .with_run("run-1")
            .with_script("001_users.sql")
            .with_run_order(0);
        ratchet_info!(context = ctx.clone(), "script applied");
        ratchet_debug!(context = ctx.clone(), "phase {} -> {}", "Idle", "Gathering");
        ratchet_warn!(context = ctx.clone(), "slow script: {} ms", 1200);
        ratchet_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn run_event_helper_emits() {
        let ctx = LogContext::new().with_run("run-2").with_mode("per-script");
        log_run_event(
            Some(&ctx),
            "upgrade.finished",
            "3 scripts applied",
            RunEventOutcome::Success,
        );
        log_run_event(None, "upgrade.finished", "failed", RunEventOutcome::Fault);
        assert_eq!(RunEventOutcome::Degraded.as_str(), "degraded");
    }
}
