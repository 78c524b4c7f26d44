//! ---
//! ratchet_section: "02-script-sources"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Scripts read from a directory tree."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ratchet_core::{
    accept_all, NamePredicate, ProviderError, Script, ScriptOptions, ScriptProvider, Session,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension selected when none is configured.
pub const DEFAULT_EXTENSION: &str = "sql";

/// Provider over script files below a root directory.
///
/// Scripts are named by their path relative to the root with `/`
/// separators, or by bare file name when [`file_name_only`] is set. File
/// contents are read when the script runs, not during enumeration.
///
/// [`file_name_only`]: FileSystemScriptProvider::file_name_only
#[derive(Clone)]
pub struct FileSystemScriptProvider {
    root: PathBuf,
    recursive: bool,
    extension: String,
    file_name_only: bool,
    options: ScriptOptions,
    predicate: NamePredicate,
}

impl FileSystemScriptProvider {
    /// Non-recursive provider over `*.sql` files in `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            extension: DEFAULT_EXTENSION.to_owned(),
            file_name_only: false,
            options: ScriptOptions::default(),
            predicate: accept_all(),
        }
    }

    /// Descend into subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Select files by this extension, compared ignoring ASCII case.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_owned();
        self
    }

    /// Name scripts by file name instead of relative path.
    pub fn file_name_only(mut self, file_name_only: bool) -> Self {
        self.file_name_only = file_name_only;
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
        self.predicate = Arc::new(predicate);
        self
    }

    /// Directory being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    fn script_name(&self, path: &Path) -> Option<String> {
        if self.file_name_only {
            return path.file_name().and_then(|n| n.to_str()).map(str::to_owned);
        }
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        parts.map(|parts| parts.join("/"))
    }
}

impl fmt::Debug for FileSystemScriptProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemScriptProvider")
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .field("extension", &self.extension)
            .field("file_name_only", &self.file_name_only)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptProvider for FileSystemScriptProvider {
    fn describe(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    fn get_scripts(&self, _session: &mut dyn Session) -> Result<Vec<Script>, ProviderError> {
        if !self.root.is_dir() {
            return Err(ProviderError::MissingDirectory(self.root.clone()));
        }

        let mut walker = WalkDir::new(&self.root).min_depth(1).sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut scripts = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|err| ProviderError::Walk {
                path: self.root.clone(),
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }
            let Some(name) = self.script_name(entry.path()) else {
                warn!(path = %entry.path().display(), "skipping script with non UTF-8 path");
                continue;
            };
            if !(self.predicate)(&name) {
                continue;
            }
            scripts.push(Script::from_file(name, self.options, entry.path()));
        }
        debug!(root = %self.root.display(), count = scripts.len(), "filesystem scripts enumerated");
        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_testharness::MemoryTarget;
    use std::fs;
    use tempfile::tempdir;

    fn names(scripts: &[Script]) -> Vec<&str> {
        scripts.iter().map(Script::name).collect()
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let provider = FileSystemScriptProvider::new(dir.path().join("absent"));
        let err = provider.get_scripts(&mut MemoryTarget::new()).unwrap_err();
        assert!(matches!(err, ProviderError::MissingDirectory(_)));
    }

    #[test]
    fn selects_extension_and_depth() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("001.sql"), "CREATE TABLE a;").unwrap();
        fs::write(dir.path().join("002.SQL"), "CREATE TABLE b;").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::create_dir(dir.path().join("v2")).unwrap();
        fs::write(dir.path().join("v2").join("003.sql"), "CREATE TABLE c;").unwrap();

        let flat = FileSystemScriptProvider::new(dir.path());
        let scripts = flat.get_scripts(&mut MemoryTarget::new()).unwrap();
        assert_eq!(names(&scripts), vec!["001.sql", "002.SQL"]);

        let deep = FileSystemScriptProvider::new(dir.path()).recursive(true);
        let scripts = deep.get_scripts(&mut MemoryTarget::new()).unwrap();
        assert_eq!(names(&scripts), vec!["001.sql", "002.SQL", "v2/003.sql"]);

        let bare = FileSystemScriptProvider::new(dir.path())
            .recursive(true)
            .file_name_only(true)
            .with_predicate(|name| name != "002.SQL");
        let scripts = bare.get_scripts(&mut MemoryTarget::new()).unwrap();
        assert_eq!(names(&scripts), vec!["001.sql", "003.sql"]);
    }

    #[test]
    fn file_is_read_when_materialised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("001.sql");
        fs::write(&path, "CREATE TABLE old;").unwrap();

        let provider = FileSystemScriptProvider::new(dir.path()).extension(".sql");
        let mut scripts = provider.get_scripts(&mut MemoryTarget::new()).unwrap();
        fs::write(&path, "CREATE TABLE new;").unwrap();

        let body = scripts.remove(0).materialize(&mut MemoryTarget::new()).unwrap();
        assert_eq!(body, "CREATE TABLE new;");
    }
}
