//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "`ratchetctl upgrade` command."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use ratchet_common::AppConfig;
use ratchet_core::{FailurePolicy, TransactionMode};
use ratchet_engine::UpgradeMetrics;

use crate::render;
use crate::wiring::{self, EngineOverrides};

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    /// Run every script in one transaction and roll it back.
    #[arg(long = "dry-run", action = ArgAction::SetTrue, conflicts_with = "transaction_mode")]
    pub dry_run: bool,

    /// Override the configured transaction mode.
    #[arg(long = "transaction-mode", value_enum)]
    pub transaction_mode: Option<TransactionModeArg>,

    /// Keep executing after a script fails.
    #[arg(long = "continue-on-failure", action = ArgAction::SetTrue)]
    pub continue_on_failure: bool,

    /// Print the run report as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Write the run's Prometheus metrics in text format to FILE.
    #[arg(long = "metrics-out", value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransactionModeArg {
    None,
    PerScript,
    Single,
    SingleAlwaysRollback,
}

impl From<TransactionModeArg> for TransactionMode {
    fn from(value: TransactionModeArg) -> Self {
        match value {
            TransactionModeArg::None => TransactionMode::None,
            TransactionModeArg::PerScript => TransactionMode::PerScript,
            TransactionModeArg::Single => TransactionMode::Single,
            TransactionModeArg::SingleAlwaysRollback => TransactionMode::SingleAlwaysRollback,
        }
    }
}

impl UpgradeArgs {
    fn overrides(&self, metrics: Option<UpgradeMetrics>) -> EngineOverrides {
        let transaction_mode = if self.dry_run {
            Some(TransactionMode::SingleAlwaysRollback)
        } else {
            self.transaction_mode.map(Into::into)
        };
        EngineOverrides {
            transaction_mode,
            failure_policy: self
                .continue_on_failure
                .then_some(FailurePolicy::ContinueOnFailure),
            metrics,
        }
    }
}

pub fn run(config: &AppConfig, args: UpgradeArgs) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let metrics = match args.metrics_out {
        Some(_) => Some(UpgradeMetrics::new(Arc::clone(&registry))?),
        None => None,
    };
    let mut engine = wiring::build_engine(config, args.overrides(metrics))?;
    let mut session = wiring::open_session(config)?;
    let report = engine.perform_upgrade(&mut session)?;

    if args.json {
        println!("{}", render::to_json(&report)?);
    } else {
        print!("{}", render::report_table(&report));
    }
    if let Some(path) = &args.metrics_out {
        write_metrics(&registry, path)?;
    }

    if report.successful() {
        Ok(())
    } else {
        Err(anyhow!("upgrade {}", report.status.as_str()))
    }
}

fn write_metrics(registry: &Registry, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, buffer)
        .with_context(|| format!("unable to write metrics to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dry_run: bool, mode: Option<TransactionModeArg>) -> UpgradeArgs {
        UpgradeArgs {
            dry_run,
            transaction_mode: mode,
            continue_on_failure: true,
            json: false,
            metrics_out: None,
        }
    }

    #[test]
    fn dry_run_forces_rollback_mode() {
        let overrides = args(true, None).overrides(None);
        assert_eq!(
            overrides.transaction_mode,
            Some(TransactionMode::SingleAlwaysRollback)
        );
        assert_eq!(
            overrides.failure_policy,
            Some(FailurePolicy::ContinueOnFailure)
        );
    }

    #[test]
    fn explicit_mode_is_passed_through() {
        let overrides = args(false, Some(TransactionModeArg::Single)).overrides(None);
        assert_eq!(overrides.transaction_mode, Some(TransactionMode::Single));
    }

    #[test]
    fn metrics_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        UpgradeMetrics::new(Arc::new(registry.clone())).unwrap();
        let path = dir.path().join("out/ratchet.prom");
        write_metrics(&registry, &path).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("ratchet_journal_writes_total 0"));
    }
}
