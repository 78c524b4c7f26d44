//! ---
//! ratchet_section: "02-script-sources"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Provider merging several sub-providers."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::sync::Arc;

use ratchet_core::{
    accept_all, NameComparer, NamePredicate, ProviderError, Script, ScriptProvider, Session,
};
use tracing::debug;

use crate::code::CodeScriptProvider;
use crate::embedded::StaticScriptProvider;

/// Concatenates the output of several providers, sorts it by name and keeps
/// the names accepted by its predicate.
///
/// The predicate selects which sources contribute; it is unrelated to the
/// journal filter the engine applies later.
pub struct CompositeScriptProvider {
    providers: Vec<Box<dyn ScriptProvider>>,
    comparer: NameComparer,
    predicate: NamePredicate,
}

impl CompositeScriptProvider {
    /// Merge `providers`.
    pub fn new(providers: Vec<Box<dyn ScriptProvider>>) -> Self {
        Self {
            providers,
            comparer: NameComparer::default(),
            predicate: accept_all(),
        }
    }

    /// Static scripts together with code scripts.
    pub fn script_and_code(scripts: StaticScriptProvider, code: CodeScriptProvider) -> Self {
        Self::new(vec![Box::new(scripts), Box::new(code)])
    }

    /// Append another provider.
    pub fn push(mut self, provider: impl ScriptProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Ordering used for the merged output.
    pub fn with_comparer(mut self, comparer: NameComparer) -> Self {
        self.comparer = comparer;
        self
    }

    /// Only emit scripts whose name satisfies `predicate`.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }
}

impl ScriptProvider for CompositeScriptProvider {
    fn describe(&self) -> String {
        let parts: Vec<String> = self.providers.iter().map(|p| p.describe()).collect();
        format!("composite[{}]", parts.join(", "))
    }

    fn get_scripts(&self, session: &mut dyn Session) -> Result<Vec<Script>, ProviderError> {
        let mut merged = Vec::new();
        for provider in &self.providers {
            merged.extend(provider.get_scripts(session)?);
        }
        merged.sort_by(|a, b| self.comparer.compare(a.name(), b.name()));
        merged.retain(|script| (self.predicate)(script.name()));
        debug!(count = merged.len(), "composite scripts enumerated");
        Ok(merged)
    }
}
