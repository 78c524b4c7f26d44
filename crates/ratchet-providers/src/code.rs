//! ---
//! ratchet_section: "02-script-sources"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Explicitly registered code-generated scripts."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use ratchet_core::{
    accept_all, NamePredicate, ProviderError, Script, ScriptError, ScriptOptions, ScriptProvider,
    Session,
};
use tracing::debug;

/// Upgrade step whose SQL is generated at execution time.
///
/// The session is live, so implementations may inspect the target before
/// deciding what to emit.
pub trait CodeScript {
    /// Produce the script body.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] when the body cannot be generated.
    fn provide_script(&self, session: &mut dyn Session) -> Result<String, ScriptError>;
}

/// Builds a fresh [`CodeScript`] instance when the script runs.
pub type CodeScriptFactory = Arc<dyn Fn() -> Box<dyn CodeScript> + Send + Sync>;

struct Registration {
    name: String,
    options: ScriptOptions,
    factory: CodeScriptFactory,
}

/// Provider over code scripts registered by name.
///
/// Instances are created only when the engine materialises the script, so a
/// journaled code script is never constructed.
#[derive(Clone)]
pub struct CodeScriptProvider {
    registrations: Vec<Arc<Registration>>,
    options: ScriptOptions,
    predicate: NamePredicate,
}

impl CodeScriptProvider {
    /// Empty provider with default options.
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            options: ScriptOptions::default(),
            predicate: accept_all(),
        }
    }

    /// Options used by registrations that do not carry their own. Must be
    /// called before those registrations.
    pub fn with_options(mut self, options: ScriptOptions) -> Self {
        self.options = options;
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

    /// Register `factory` under the journal key `name`.
    pub fn register<F, C>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: CodeScript + 'static,
    {
        let options = self.options;
        self.register_with(name, options, factory)
    }

    /// Register with explicit options.
    pub fn register_with<F, C>(
        mut self,
        name: impl Into<String>,
        options: ScriptOptions,
        factory: F,
    ) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: CodeScript + 'static,
    {
        let factory: CodeScriptFactory =
            Arc::new(move || Box::new(factory()) as Box<dyn CodeScript>);
        self.registrations.push(Arc::new(Registration {
            name: name.into(),
            options,
            factory,
        }));
        self
    }

    /// Registered script count, before the predicate.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for CodeScriptProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodeScriptProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.registrations.iter().map(|r| r.name.as_str()).collect();
        f.debug_struct("CodeScriptProvider")
            .field("registrations", &names)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptProvider for CodeScriptProvider {
    fn describe(&self) -> String {
        format!("code({} scripts)", self.registrations.len())
    }

    fn get_scripts(&self, _session: &mut dyn Session) -> Result<Vec<Script>, ProviderError> {
        let scripts: Vec<Script> = self
            .registrations
            .iter()
            .filter(|registration| (self.predicate)(&registration.name))
            .map(|registration| {
                let factory = Arc::clone(&registration.factory);
                Script::deferred(registration.name.clone(), registration.options, move |session| {
                    factory().provide_script(session)
                })
            })
            .collect();
        debug!(count = scripts.len(), "code scripts enumerated");
        Ok(scripts)
    }
}
