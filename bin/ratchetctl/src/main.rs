//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Control CLI applying change scripts to a target database."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use ratchet_common::{init_tracing, VersionInfo};
use tracing::info;

mod mark;
mod render;
mod status;
mod upgrade;
mod wiring;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Apply versioned change scripts exactly once, in order",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
    /// Configuration file; defaults to RATCHET_CONFIG, then ./ratchet.toml.
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply every pending script.
    Upgrade(upgrade::UpgradeArgs),
    /// Show journaled and pending scripts without changing anything.
    Status(status::StatusArgs),
    /// Journal pending run-once scripts without executing them.
    #[command(name = "mark-executed")]
    MarkExecuted(mark::MarkArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let loaded = wiring::load_config(cli.config.as_deref())?;
    init_tracing("ratchetctl", &loaded.config.logging)?;
    info!(
        config = %loaded.source.display(),
        version = %VersionInfo::current().cli_string(),
        "ratchetctl starting"
    );

    match command {
        Commands::Upgrade(args) => upgrade::run(&loaded.config, args),
        Commands::Status(args) => status::run(&loaded.config, args),
        Commands::MarkExecuted(args) => mark::run(&loaded.config, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_upgrade_flags() {
        let cli = Cli::parse_from([
            "ratchetctl",
            "upgrade",
            "--dry-run",
            "--config",
            "conf/ratchet.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("conf/ratchet.toml")));
        assert!(matches!(cli.command, Some(Commands::Upgrade(ref args)) if args.dry_run));
    }
}
