//! ---
//! ratchet_section: "04-configuration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "TOML configuration model, loading and validation."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use ratchet_core::{
    CaseSensitivity, FailurePolicy, NameComparer, ScriptOptions, ScriptType, TransactionMode,
    DEFAULT_RUN_ORDER,
};
use ratchet_journal::{validate_table_name, DEFAULT_JOURNAL_TABLE};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_database() -> PathBuf {
    PathBuf::from("data/ratchet.db")
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_journal_table() -> String {
    DEFAULT_JOURNAL_TABLE.to_owned()
}

fn default_extension() -> String {
    "sql".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_true() -> bool {
    true
}

/// Primary configuration object for `ratchetctl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "RATCHET_CONFIG";

    /// Load configuration from disk, respecting the `RATCHET_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read, parse and validate one file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let mut config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(anyhow!(
                "configuration must declare at least one [[sources]] entry"
            ));
        }
        for (index, source) in self.sources.iter().enumerate() {
            source.validate(index)?;
        }
        self.journal.validate()?;
        Ok(())
    }

    /// Anchor relative paths at `base`.
    pub fn resolve_relative(&mut self, base: &Path) {
        resolve(base, &mut self.target.database);
        if let Some(path) = self.journal.path.as_mut() {
            resolve(base, path);
        }
        for source in &mut self.sources {
            resolve(base, &mut source.path);
        }
        resolve(base, &mut self.logging.directory);
    }
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() && !base.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Database the scripts are applied to.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_busy_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub busy_timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            busy_timeout: default_busy_timeout(),
        }
    }
}

/// Where applied scripts are recorded.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    #[default]
    Table,
    File,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub kind: JournalKind,
    #[serde(default = "default_journal_table")]
    pub table: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            kind: JournalKind::Table,
            table: default_journal_table(),
            path: None,
        }
    }
}

impl JournalConfig {
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            JournalKind::Table => validate_table_name(&self.table)
                .with_context(|| "journal.table must be a plain SQL identifier")?,
            JournalKind::File if self.path.is_none() => {
                return Err(anyhow!("journal.kind = \"file\" requires journal.path"));
            }
            JournalKind::File | JournalKind::None => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub transaction_mode: TransactionMode,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,
    /// Fail on `$name$` tokens without a value instead of leaving them.
    #[serde(default = "default_true")]
    pub strict_variables: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_mode: TransactionMode::default(),
            failure_policy: FailurePolicy::default(),
            case_sensitivity: CaseSensitivity::default(),
            strict_variables: true,
        }
    }
}

impl EngineConfig {
    pub fn comparer(&self) -> NameComparer {
        NameComparer::new(self.case_sensitivity)
    }
}

/// Options applied to sources that do not set their own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub run_order: i32,
    #[serde(default)]
    pub script_type: ScriptType,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            run_order: DEFAULT_RUN_ORDER,
            script_type: ScriptType::RunOnce,
        }
    }
}

/// One directory of scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub run_order: Option<i32>,
    #[serde(default)]
    pub script_type: Option<ScriptType>,
    #[serde(default)]
    pub file_name_only: bool,
    #[serde(default)]
    pub include_prefixes: Vec<String>,
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
}

impl SourceConfig {
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(anyhow!("sources[{}].path must not be empty", index));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(anyhow!("sources[{}].extension must not be empty", index));
        }
        Ok(())
    }

    /// Script options for this source, falling back to `defaults`.
    pub fn options(&self, defaults: &DefaultsConfig) -> ScriptOptions {
        ScriptOptions::default()
            .with_run_order(self.run_order.unwrap_or(defaults.run_order))
            .with_script_type(self.script_type.unwrap_or(defaults.script_type))
    }

    /// Whether a script name passes the include/exclude prefix lists.
    pub fn accepts(&self, name: &str) -> bool {
        let included = self.include_prefixes.is_empty()
            || self.include_prefixes.iter().any(|p| name.starts_with(p.as_str()));
        included && !self.exclude_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const SAMPLE: &str = r#"
[target]
database = "app.db"
busy_timeout = 2

[journal]
kind = "table"
table = "applied_scripts"

[engine]
transaction_mode = "single"
failure_policy = "continue-on-failure"
case_sensitivity = "sensitive"

[defaults]
run_order = 10

[[sources]]
path = "migrations"
recursive = true
exclude_prefixes = ["dev_"]

[[sources]]
path = "views"
run_order = 100
script_type = "run-always"

[variables]
schema = "app"
owner = "svc"
"#;

    #[test]
    fn parses_full_sample() {
        let config = AppConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.target.busy_timeout, Duration::from_secs(2));
        assert_eq!(config.journal.table, "applied_scripts");
        assert_eq!(config.engine.transaction_mode, TransactionMode::Single);
        assert_eq!(
            config.engine.failure_policy,
            FailurePolicy::ContinueOnFailure
        );
        assert_eq!(config.engine.comparer(), NameComparer::case_sensitive());
        assert!(config.engine.strict_variables);

        let migrations = config.sources[0].options(&config.defaults);
        assert_eq!(migrations.run_order, 10);
        assert_eq!(migrations.script_type, ScriptType::RunOnce);
        let views = config.sources[1].options(&config.defaults);
        assert_eq!(views.run_order, 100);
        assert_eq!(views.script_type, ScriptType::RunAlways);

        let keys: Vec<&str> = config.variables.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["schema", "owner"]);
    }

    #[test]
    fn rejects_missing_sources() {
        let err = AppConfig::from_str("[target]\ndatabase = \"x.db\"\n").unwrap_err();
        assert!(err.to_string().contains("[[sources]]"));
    }

    #[test]
    fn rejects_bad_table_and_file_without_path() {
        let bad_table = "[journal]\ntable = \"x y\"\n[[sources]]\npath = \"m\"\n";
        assert!(AppConfig::from_str(bad_table).is_err());

        let no_path = "[journal]\nkind = \"file\"\n[[sources]]\npath = \"m\"\n";
        let err = AppConfig::from_str(no_path).unwrap_err();
        assert!(err.to_string().contains("journal.path"));
    }

    #[test]
    fn prefix_lists_select_names() {
        let config = AppConfig::from_str(SAMPLE).unwrap();
        assert!(config.sources[0].accepts("001_users.sql"));
        assert!(!config.sources[0].accepts("dev_seed.sql"));

        let mut only = config.sources[1].clone();
        only.include_prefixes = vec!["v_".into()];
        assert!(only.accepts("v_active.sql"));
        assert!(!only.accepts("active.sql"));
    }

    #[test]
    fn load_resolves_paths_next_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratchet.toml");
        fs::write(&path, SAMPLE).unwrap();

        let loaded = AppConfig::load_with_source(&[&path]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.target.database, dir.path().join("app.db"));
        assert_eq!(loaded.config.sources[0].path, dir.path().join("migrations"));
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let err = AppConfig::load(&["/nonexistent/ratchet.toml"]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ratchet.toml"));
    }
}
