//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Assemble session, journal, providers and engine from configuration."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ratchet_common::{AppConfig, JournalKind, LoadedAppConfig};
use ratchet_core::{FailurePolicy, NameComparer, ScriptProvider, TransactionMode};
use ratchet_engine::{UpgradeEngine, UpgradeMetrics};
use ratchet_journal::{FileJournal, Journal, NullJournal, SqliteSession, TableJournal};
use ratchet_providers::{CompositeScriptProvider, FileSystemScriptProvider};
use tracing::debug;

/// Searched in order when neither `--config` nor `RATCHET_CONFIG` is set.
pub const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["ratchet.toml", "configs/ratchet.toml"];

/// Command line adjustments applied on top of the configured engine.
#[derive(Debug, Default)]
pub struct EngineOverrides {
    pub transaction_mode: Option<TransactionMode>,
    pub failure_policy: Option<FailurePolicy>,
    pub metrics: Option<UpgradeMetrics>,
}

pub fn load_config(explicit: Option<&Path>) -> Result<LoadedAppConfig> {
    match explicit {
        Some(path) => Ok(LoadedAppConfig {
            config: AppConfig::from_path(path)?,
            source: path.to_path_buf(),
        }),
        None => AppConfig::load_with_source(&DEFAULT_CONFIG_CANDIDATES),
    }
}

pub fn open_session(config: &AppConfig) -> Result<SqliteSession> {
    let database = &config.target.database;
    let session = SqliteSession::open(database)
        .with_context(|| format!("unable to open database {}", database.display()))?
        .with_busy_timeout(config.target.busy_timeout)?;
    Ok(session)
}

pub fn build_engine(config: &AppConfig, overrides: EngineOverrides) -> Result<UpgradeEngine> {
    let comparer = config.engine.comparer();
    let mut builder = UpgradeEngine::builder()
        .with_provider(scripts_provider(config, comparer))
        .with_boxed_journal(journal(config, comparer)?)
        .with_comparer(comparer)
        .with_transaction_mode(
            overrides
                .transaction_mode
                .unwrap_or(config.engine.transaction_mode),
        )
        .with_failure_policy(
            overrides
                .failure_policy
                .unwrap_or(config.engine.failure_policy),
        );
    if !config.variables.is_empty() {
        builder = builder.with_variables(config.variables.clone(), config.engine.strict_variables);
    }
    if let Some(metrics) = overrides.metrics {
        builder = builder.with_metrics(metrics);
    }
    let engine = builder.build();
    debug!(?engine, "engine assembled");
    Ok(engine)
}

fn scripts_provider(config: &AppConfig, comparer: NameComparer) -> CompositeScriptProvider {
    let providers = config
        .sources
        .iter()
        .map(|source| {
            let prefixes = source.clone();
            Box::new(
                FileSystemScriptProvider::new(source.path.clone())
                    .recursive(source.recursive)
                    .extension(source.extension.clone())
                    .file_name_only(source.file_name_only)
                    .with_options(source.options(&config.defaults))
                    .with_predicate(move |name: &str| prefixes.accepts(name)),
            ) as Box<dyn ScriptProvider>
        })
        .collect();
    CompositeScriptProvider::new(providers).with_comparer(comparer)
}

fn journal(config: &AppConfig, comparer: NameComparer) -> Result<Box<dyn Journal>> {
    let journal: Box<dyn Journal> = match config.journal.kind {
        JournalKind::Table => Box::new(
            TableJournal::with_table(config.journal.table.clone())?.with_comparer(comparer),
        ),
        JournalKind::File => {
            let path = config
                .journal
                .path
                .clone()
                .ok_or_else(|| anyhow!("journal.kind = \"file\" requires journal.path"))?;
            Box::new(FileJournal::new(path).with_comparer(comparer))
        }
        JournalKind::None => Box::new(NullJournal),
    };
    Ok(journal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(dir: &Path, journal: &str) -> AppConfig {
        let text = format!(
            r#"
[target]
database = "app.db"

[journal]
{journal}

[[sources]]
path = "scripts"
exclude_prefixes = ["skip_"]
"#
        );
        let path = dir.join("ratchet.toml");
        fs::write(&path, text).unwrap();
        AppConfig::from_path(&path).unwrap()
    }

    #[test]
    fn assembles_engine_from_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("001_init.sql"), "CREATE TABLE t (id INTEGER);").unwrap();
        fs::write(scripts.join("skip_me.sql"), "SELECT 1;").unwrap();

        let config = config(dir.path(), "kind = \"table\"");
        let mut engine = build_engine(&config, EngineOverrides::default()).unwrap();
        let mut session = open_session(&config).unwrap();
        let pending = engine.scripts_to_execute(&mut session).unwrap();
        let names: Vec<_> = pending.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["001_init.sql"]);
        assert!(dir.path().join("app.db").exists());
    }

    #[test]
    fn file_journal_lives_beside_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "kind = \"file\"\npath = \"journal.jsonl\"");
        let engine = build_engine(&config, EngineOverrides::default()).unwrap();
        assert_eq!(
            engine.journal_description(),
            format!("file:{}", dir.path().join("journal.jsonl").display())
        );
    }

    #[test]
    fn explicit_config_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        config(dir.path(), "kind = \"none\"");
        let loaded = load_config(Some(&dir.path().join("ratchet.toml"))).unwrap();
        assert_eq!(loaded.source, dir.path().join("ratchet.toml"));
        assert_eq!(loaded.config.journal.kind, JournalKind::None);
    }
}
