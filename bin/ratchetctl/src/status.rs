//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "`ratchetctl status` command."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{ArgAction, Args};
use ratchet_common::AppConfig;
use ratchet_core::Session;

use crate::render::{self, StatusView};
use crate::wiring::{self, EngineOverrides};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print the status as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

pub fn run(config: &AppConfig, args: StatusArgs) -> Result<()> {
    let mut engine = wiring::build_engine(config, EngineOverrides::default())?;
    let mut session = wiring::open_session(config)?;
    let executed = engine.executed_scripts(&mut session)?;
    let pending = engine.scripts_to_execute(&mut session)?;

    let view = StatusView {
        target: session.describe(),
        journal: engine.journal_description(),
        upgrade_required: !pending.is_empty(),
        executed: executed.into_iter().collect(),
        pending,
    };
    if args.json {
        println!("{}", render::to_json(&view)?);
    } else {
        print!("{}", render::status_text(&view));
    }
    Ok(())
}
