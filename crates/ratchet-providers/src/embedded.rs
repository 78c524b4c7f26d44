//! ---
//! ratchet_section: "02-script-sources"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Scripts compiled into the binary."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;

use ratchet_core::{
    accept_all, NamePredicate, ProviderError, Script, ScriptOptions, ScriptProvider, Session,
};
use tracing::debug;

/// Provider over `(name, text)` pairs, typically built from `include_str!`.
///
/// ```
/// use ratchet_providers::StaticScriptProvider;
///
/// let provider = StaticScriptProvider::new()
///     .add("001_users.sql", "CREATE TABLE users (id INTEGER PRIMARY KEY);")
///     .add("002_roles.sql", "CREATE TABLE roles (id INTEGER PRIMARY KEY);");
/// assert_eq!(provider.len(), 2);
/// ```
#[derive(Clone)]
pub struct StaticScriptProvider {
    scripts: Vec<(String, String)>,
    options: ScriptOptions,
    predicate: NamePredicate,
}

impl StaticScriptProvider {
    /// Empty provider with default options.
    pub fn new() -> Self {
        Self {
            scripts: Vec::new(),
            options: ScriptOptions::default(),
            predicate: accept_all(),
        }
    }

    /// Provider over `pairs`.
    pub fn from_pairs<I, N, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |provider, (name, text)| provider.add(name, text))
    }

    /// Register one script.
    pub fn add(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.scripts.push((name.into(), text.into()));
        self
    }

    /// Type and run order applied to every script.
    pub fn with_options(mut self, options: ScriptOptions) -> Self {
        self.options = options;
        self
    }

    /// Only emit scripts whose name satisfies `predicate`.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = std::sync::Arc::new(predicate);
        self
    }

    /// Registered script count, before the predicate.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl Default for StaticScriptProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StaticScriptProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticScriptProvider")
            .field("scripts", &self.scripts.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptProvider for StaticScriptProvider {
    fn describe(&self) -> String {
        format!("static({} scripts)", self.scripts.len())
    }

    fn get_scripts(&self, _session: &mut dyn Session) -> Result<Vec<Script>, ProviderError> {
        let scripts: Vec<Script> = self
            .scripts
            .iter()
            .filter(|(name, _)| (self.predicate)(name))
            .map(|(name, text)| Script::with_options(name.clone(), self.options, text.clone()))
            .collect();
        debug!(count = scripts.len(), "static scripts enumerated");
        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_core::ScriptType;
    use ratchet_testharness::MemoryTarget;

    #[test]
    fn predicate_and_options_apply() {
        let provider = StaticScriptProvider::from_pairs([
            ("001_schema.sql", "CREATE TABLE a (id INTEGER);"),
            ("seed_dev.sql", "INSERT INTO a VALUES (1);"),
        ])
        .with_options(ScriptOptions::run_always().with_run_order(5))
        .with_predicate(|name| !name.starts_with("seed_"));

        let scripts = provider.get_scripts(&mut MemoryTarget::new()).unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name(), "001_schema.sql");
        assert_eq!(scripts[0].script_type(), ScriptType::RunAlways);
        assert_eq!(scripts[0].run_order(), 5);
    }

    #[test]
    fn enumeration_executes_nothing() {
        let target = MemoryTarget::new();
        let provider = StaticScriptProvider::new().add("a.sql", "CREATE TABLE a;");
        provider.get_scripts(&mut target.clone()).unwrap();
        assert!(target.attempts().is_empty());
    }
}
