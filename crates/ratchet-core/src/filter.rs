//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Journal-aware script selection strategies."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::comparer::NameComparer;
use crate::script::Script;

/// Decides which run-once candidates still need to run.
///
/// Filters receive the journal's name snapshot rather than the journal
/// itself and must keep the relative order of the candidates they return.
pub trait ScriptFilter {
    /// Select the scripts to execute.
    fn filter(
        &self,
        candidates: Vec<Script>,
        executed: &BTreeSet<String>,
        comparer: &NameComparer,
    ) -> Vec<Script>;
}

/// Keeps every candidate that is not journaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScriptFilter;

impl ScriptFilter for DefaultScriptFilter {
    fn filter(
        &self,
        candidates: Vec<Script>,
        executed: &BTreeSet<String>,
        comparer: &NameComparer,
    ) -> Vec<Script> {
        let executed = comparer.key_set(executed);
        candidates
            .into_iter()
            .filter(|script| !executed.contains(comparer.key(script.name()).as_ref()))
            .collect()
    }
}

/// Ignores the journal and keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RerunAllFilter;

impl ScriptFilter for RerunAllFilter {
    fn filter(
        &self,
        candidates: Vec<Script>,
        _executed: &BTreeSet<String>,
        _comparer: &NameComparer,
    ) -> Vec<Script> {
        candidates
    }
}

/// Keeps unjournaled candidates whose name is in an allow list.
#[derive(Debug, Clone, Default)]
pub struct NamedSubsetFilter {
    names: Vec<String>,
}

impl NamedSubsetFilter {
    /// Restrict execution to `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ScriptFilter for NamedSubsetFilter {
    fn filter(
        &self,
        candidates: Vec<Script>,
        executed: &BTreeSet<String>,
        comparer: &NameComparer,
    ) -> Vec<Script> {
        let wanted = comparer.key_set(&self.names);
        DefaultScriptFilter
            .filter(candidates, executed, comparer)
            .into_iter()
            .filter(|script| wanted.contains(comparer.key(script.name()).as_ref()))
            .collect()
    }
}

/// Keeps unjournaled candidates whose name orders after a watermark.
#[derive(Debug, Clone)]
pub struct WatermarkFilter {
    watermark: String,
}

impl WatermarkFilter {
    /// Only run scripts named strictly after `watermark`.
    pub fn new(watermark: impl Into<String>) -> Self {
        Self {
            watermark: watermark.into(),
        }
    }
}

impl ScriptFilter for WatermarkFilter {
    fn filter(
        &self,
        candidates: Vec<Script>,
        executed: &BTreeSet<String>,
        comparer: &NameComparer,
    ) -> Vec<Script> {
        DefaultScriptFilter
            .filter(candidates, executed, comparer)
            .into_iter()
            .filter(|script| comparer.compare(script.name(), &self.watermark) == Ordering::Greater)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<Script> {
        names.iter().map(|name| Script::new(*name, "")).collect()
    }

    fn executed(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn names(scripts: &[Script]) -> Vec<String> {
        scripts.iter().map(|s| s.name().to_owned()).collect()
    }

    #[test]
    fn default_filter_respects_case_policy() {
        let journal = executed(&["Script001.sql"]);

        let kept = DefaultScriptFilter.filter(
            candidates(&["script001.sql", "script002.sql"]),
            &journal,
            &NameComparer::case_insensitive(),
        );
        assert_eq!(names(&kept), vec!["script002.sql"]);

        let kept = DefaultScriptFilter.filter(
            candidates(&["script001.sql", "script002.sql"]),
            &journal,
            &NameComparer::case_sensitive(),
        );
        assert_eq!(names(&kept), vec!["script001.sql", "script002.sql"]);
    }

    #[test]
    fn rerun_all_ignores_journal() {
        let kept = RerunAllFilter.filter(
            candidates(&["a", "b"]),
            &executed(&["a", "b"]),
            &NameComparer::default(),
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn named_subset_keeps_only_listed_pending() {
        let filter = NamedSubsetFilter::new(["B.sql", "c.sql"]);
        let kept = filter.filter(
            candidates(&["a.sql", "b.sql", "c.sql"]),
            &executed(&["c.sql"]),
            &NameComparer::case_insensitive(),
        );
        assert_eq!(names(&kept), vec!["b.sql"]);
    }

    #[test]
    fn watermark_keeps_later_names() {
        let filter = WatermarkFilter::new("002.sql");
        let kept = filter.filter(
            candidates(&["001.sql", "002.sql", "003.sql", "004.sql"]),
            &executed(&["004.sql"]),
            &NameComparer::case_insensitive(),
        );
        assert_eq!(names(&kept), vec!["003.sql"]);
    }
}
