//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script entity with deferred content materialisation."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::comparer::NameComparer;
use crate::error::ScriptError;
use crate::session::Session;

/// Run-order group assigned when a provider is not told otherwise.
pub const DEFAULT_RUN_ORDER: i32 = 0;

/// Journal behaviour of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    /// Journaled after success and skipped on later runs.
    #[default]
    RunOnce,
    /// Executed on every run, never journaled.
    RunAlways,
}

impl ScriptType {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::RunOnce => "run-once",
            ScriptType::RunAlways => "run-always",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type and run-order group handed to providers at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOptions {
    /// Journal behaviour.
    #[serde(default)]
    pub script_type: ScriptType,
    /// Ascending execution group.
    #[serde(default)]
    pub run_order: i32,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            script_type: ScriptType::RunOnce,
            run_order: DEFAULT_RUN_ORDER,
        }
    }
}

impl ScriptOptions {
    /// Options for a script that executes on every run.
    pub fn run_always() -> Self {
        Self {
            script_type: ScriptType::RunAlways,
            ..Self::default()
        }
    }

    /// Replace the run-order group.
    pub fn with_run_order(mut self, run_order: i32) -> Self {
        self.run_order = run_order;
        self
    }

    /// Replace the script type.
    pub fn with_script_type(mut self, script_type: ScriptType) -> Self {
        self.script_type = script_type;
        self
    }
}

/// Producer invoked with the live session when a deferred script runs.
pub type ContentFn = Box<dyn FnOnce(&mut dyn Session) -> Result<String, ScriptError> + Send>;

enum ScriptBody {
    Inline(String),
    File(PathBuf),
    Deferred(ContentFn),
}

/// Name, type and run order of a script, detached from its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptDescriptor {
    /// Journal key and display name.
    pub name: String,
    /// Journal behaviour.
    pub script_type: ScriptType,
    /// Execution group.
    pub run_order: i32,
}

/// One named unit of change.
///
/// The body is only produced by [`Script::materialize`], which consumes the
/// script; content is therefore evaluated at most once and never during
/// enumeration.
pub struct Script {
    name: String,
    options: ScriptOptions,
    body: ScriptBody,
}

impl Script {
    /// Inline script with default options.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_options(name, ScriptOptions::default(), content)
    }

    /// Inline script with explicit options.
    pub fn with_options(
        name: impl Into<String>,
        options: ScriptOptions,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            options,
            body: ScriptBody::Inline(content.into()),
        }
    }

    /// Script whose body is read from `path` when it runs.
    pub fn from_file(name: impl Into<String>, options: ScriptOptions, path: &Path) -> Self {
        Self {
            name: name.into(),
            options,
            body: ScriptBody::File(path.to_path_buf()),
        }
    }

    /// Script whose body is generated against the live session when it runs.
    pub fn deferred<F>(name: impl Into<String>, options: ScriptOptions, producer: F) -> Self
    where
        F: FnOnce(&mut dyn Session) -> Result<String, ScriptError> + Send + 'static,
    {
        Self {
            name: name.into(),
            options,
            body: ScriptBody::Deferred(Box::new(producer)),
        }
    }

    /// Journal key and display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type and run order.
    pub fn options(&self) -> ScriptOptions {
        self.options
    }

    /// Journal behaviour.
    pub fn script_type(&self) -> ScriptType {
        self.options.script_type
    }

    /// Execution group.
    pub fn run_order(&self) -> i32 {
        self.options.run_order
    }

    /// Snapshot of the script identity for reports.
    pub fn descriptor(&self) -> ScriptDescriptor {
        ScriptDescriptor {
            name: self.name.clone(),
            script_type: self.options.script_type,
            run_order: self.options.run_order,
        }
    }

    /// Produce the script text.
    pub fn materialize(self, session: &mut dyn Session) -> Result<String, ScriptError> {
        match self.body {
            ScriptBody::Inline(text) => Ok(text),
            ScriptBody::File(path) => read_script_file(&path),
            ScriptBody::Deferred(producer) => producer(session),
        }
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            ScriptBody::Inline(_) => "inline".to_owned(),
            ScriptBody::File(path) => format!("file:{}", path.display()),
            ScriptBody::Deferred(_) => "deferred".to_owned(),
        };
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("body", &body)
            .finish()
    }
}

fn read_script_file(path: &Path) -> Result<String, ScriptError> {
    let bytes = fs::read(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ScriptError::Encoding(path.to_path_buf()))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_owned(),
        None => text,
    })
}

/// Stable sort by run-order group, then by name under `comparer`.
pub fn order_scripts(scripts: &mut [Script], comparer: &NameComparer) {
    scripts.sort_by(|a, b| {
        a.run_order()
            .cmp(&b.run_order())
            .then_with(|| comparer.compare(a.name(), b.name()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TargetError;

    struct NoopSession;

    impl Session for NoopSession {
        fn describe(&self) -> String {
            "noop".into()
        }
        fn execute(&mut self, _sql: &str) -> Result<(), TargetError> {
            Ok(())
        }
        fn execute_with(&mut self, _sql: &str, _params: &[&str]) -> Result<usize, TargetError> {
            Ok(0)
        }
        fn query_strings(
            &mut self,
            _sql: &str,
            _params: &[&str],
        ) -> Result<Vec<String>, TargetError> {
            Ok(vec!["users".into()])
        }
        fn begin(&mut self) -> Result<(), TargetError> {
            Ok(())
        }
        fn commit(&mut self) -> Result<(), TargetError> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<(), TargetError> {
            Ok(())
        }
        fn in_transaction(&self) -> bool {
            false
        }
    }

    fn names(scripts: &[Script]) -> Vec<&str> {
        scripts.iter().map(Script::name).collect()
    }

    #[test]
    fn ordering_groups_before_names() {
        let mut scripts = vec![
            Script::with_options("B1", ScriptOptions::default().with_run_order(100), ""),
            Script::with_options("A1", ScriptOptions::default().with_run_order(100), ""),
            Script::with_options("A2", ScriptOptions::default().with_run_order(50), ""),
        ];
        order_scripts(&mut scripts, &NameComparer::case_insensitive());
        assert_eq!(names(&scripts), vec!["A2", "A1", "B1"]);
    }

    #[test]
    fn deferred_body_sees_session() {
        let script = Script::deferred("gen", ScriptOptions::default(), |session| {
            let tables = session.query_strings("SELECT name FROM tables", &[])?;
            Ok(format!("-- {}", tables.join(",")))
        });
        let body = script.materialize(&mut NoopSession).unwrap();
        assert_eq!(body, "-- users");
    }

    #[test]
    fn file_body_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.sql");
        fs::write(&path, "\u{feff}CREATE TABLE t (id INTEGER);").unwrap();
        let script = Script::from_file("001.sql", ScriptOptions::default(), &path);
        assert_eq!(
            script.materialize(&mut NoopSession).unwrap(),
            "CREATE TABLE t (id INTEGER);"
        );
    }

    #[test]
    fn missing_file_is_a_materialisation_error() {
        let script = Script::from_file(
            "gone.sql",
            ScriptOptions::default(),
            Path::new("/nonexistent/gone.sql"),
        );
        let err = script.materialize(&mut NoopSession).unwrap_err();
        assert!(matches!(err, ScriptError::Read { .. }));
    }

    #[test]
    fn options_round_trip_through_toml_names() {
        assert_eq!(ScriptType::RunAlways.to_string(), "run-always");
        let options = ScriptOptions::run_always().with_run_order(7);
        assert_eq!(options.script_type, ScriptType::RunAlways);
        assert_eq!(options.run_order, 7);
    }
}
