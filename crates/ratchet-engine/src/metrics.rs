//! ---
//! ratchet_section: "07-orchestration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Prometheus metrics for upgrade runs."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{self, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

/// Metrics published by the upgrade engine.
#[derive(Clone)]
pub struct UpgradeMetrics {
    runs: IntCounterVec,
    scripts_applied: IntCounterVec,
    scripts_failed: IntCounterVec,
    scripts_skipped: IntCounterVec,
    journal_writes: IntCounter,
    script_duration: HistogramVec,
    registry: Arc<Registry>,
}

impl UpgradeMetrics {
    /// Register all engine metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let runs = IntCounterVec::new(
            Opts::new("ratchet_runs_total", "Upgrade runs by terminal status"),
            &["status"],
        )?;
        registry.register(Box::new(runs.clone()))?;

        let scripts_applied = IntCounterVec::new(
            Opts::new(
                "ratchet_scripts_applied_total",
                "Scripts executed successfully",
            ),
            &["script_type"],
        )?;
        registry.register(Box::new(scripts_applied.clone()))?;

        let scripts_failed = IntCounterVec::new(
            Opts::new(
                "ratchet_scripts_failed_total",
                "Scripts that failed, by stage",
            ),
            &["script_type", "stage"],
        )?;
        registry.register(Box::new(scripts_failed.clone()))?;

        let scripts_skipped = IntCounterVec::new(
            Opts::new(
                "ratchet_scripts_skipped_total",
                "Scripts not executed, by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(scripts_skipped.clone()))?;

        let journal_writes = IntCounter::with_opts(Opts::new(
            "ratchet_journal_writes_total",
            "Journal entries written",
        ))?;
        registry.register(Box::new(journal_writes.clone()))?;

        let histogram_opts = HistogramOpts::new(
            "ratchet_script_duration_seconds",
            "Time spent materialising and executing a script",
        )
        .buckets(prometheus::exponential_buckets(0.001, 2.0, 14)?);
        let script_duration = HistogramVec::new(histogram_opts, &["script_type"])?;
        registry.register(Box::new(script_duration.clone()))?;

        Ok(Self {
            runs,
            scripts_applied,
            scripts_failed,
            scripts_skipped,
            journal_writes,
            script_duration,
            registry,
        })
    }

    /// Registry the metrics were registered with.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn record_run(&self, status: &str) {
        self.runs.with_label_values(&[status]).inc();
    }

    pub(crate) fn record_applied(&self, script_type: &str, seconds: f64) {
        self.scripts_applied.with_label_values(&[script_type]).inc();
        self.script_duration
            .with_label_values(&[script_type])
            .observe(seconds);
    }

    pub(crate) fn record_failed(&self, script_type: &str, stage: &str) {
        self.scripts_failed
            .with_label_values(&[script_type, stage])
            .inc();
    }

    pub(crate) fn record_skipped(&self, reason: &str) {
        self.scripts_skipped.with_label_values(&[reason]).inc();
    }

    pub(crate) fn record_journal_write(&self) {
        self.journal_writes.inc();
    }
}

impl std::fmt::Debug for UpgradeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeMetrics").finish_non_exhaustive()
    }
}
