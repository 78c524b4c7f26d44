//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "`ratchetctl mark-executed` command."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{ArgAction, Args};
use ratchet_common::AppConfig;
use ratchet_logging::{log_run_event, LogContext, RunEventOutcome};

use crate::render;
use crate::wiring::{self, EngineOverrides};

#[derive(Debug, Args)]
pub struct MarkArgs {
    /// Print the marked names as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

pub fn run(config: &AppConfig, args: MarkArgs) -> Result<()> {
    let mut engine = wiring::build_engine(config, EngineOverrides::default())?;
    let mut session = wiring::open_session(config)?;
    let marked = engine.mark_as_executed(&mut session)?;

    let ctx = LogContext::new().with_mode(engine.transaction_mode().as_str());
    log_run_event(
        Some(&ctx),
        "journal.marked",
        &format!("{} scripts recorded without execution", marked.len()),
        RunEventOutcome::Degraded,
    );
    if args.json {
        println!("{}", render::to_json(&marked)?);
    } else if marked.is_empty() {
        println!("Nothing to mark; journal is up to date");
    } else {
        for name in &marked {
            println!("marked {name}");
        }
    }
    Ok(())
}
