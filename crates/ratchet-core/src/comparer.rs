//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script name equality and ordering policy."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Whether script names differing only in case denote the same script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseSensitivity {
    /// `Script001.sql` and `script001.sql` are the same script.
    #[default]
    Insensitive,
    /// Names must match exactly.
    Sensitive,
}

/// Total order and equality over script names.
///
/// Case-insensitive comparison folds every character to upper case and
/// compares the folded sequences ordinally. There is no tie-break on the
/// original spelling: two names are equal exactly when they order as equal,
/// and [`NameComparer::key`] produces the same normalised string for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameComparer {
    sensitivity: CaseSensitivity,
}

impl NameComparer {
    /// Build a comparer with the given case policy.
    pub const fn new(sensitivity: CaseSensitivity) -> Self {
        Self { sensitivity }
    }

    /// Default policy.
    pub const fn case_insensitive() -> Self {
        Self::new(CaseSensitivity::Insensitive)
    }

    /// Exact ordinal comparison.
    pub const fn case_sensitive() -> Self {
        Self::new(CaseSensitivity::Sensitive)
    }

    /// Active case policy.
    pub fn sensitivity(&self) -> CaseSensitivity {
        self.sensitivity
    }

    /// Order two names.
    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match self.sensitivity {
            CaseSensitivity::Sensitive => left.cmp(right),
            CaseSensitivity::Insensitive => fold(left).cmp(fold(right)),
        }
    }

    /// Whether two names identify the same script.
    pub fn equals(&self, left: &str, right: &str) -> bool {
        self.compare(left, right) == Ordering::Equal
    }

    /// Normalised form of `name`; equal keys if and only if equal names.
    pub fn key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self.sensitivity {
            CaseSensitivity::Sensitive => Cow::Borrowed(name),
            CaseSensitivity::Insensitive => Cow::Owned(fold(name).collect()),
        }
    }

    /// Collect the normalised keys of `names`.
    pub fn key_set<I>(&self, names: I) -> HashSet<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| self.key(name.as_ref()).into_owned())
            .collect()
    }

    /// Membership test under this comparer.
    pub fn contains<I>(&self, names: I, name: &str) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        names
            .into_iter()
            .any(|candidate| self.equals(candidate.as_ref(), name))
    }
}

fn fold(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insensitive_equality_matches_ordering() {
        let comparer = NameComparer::case_insensitive();
        assert!(comparer.equals("Script001.sql", "script001.SQL"));
        assert_eq!(
            comparer.compare("Script001.sql", "script001.SQL"),
            Ordering::Equal
        );
        assert_eq!(
            comparer.key("Script001.sql"),
            comparer.key("script001.SQL")
        );
    }

    #[test]
    fn sensitive_distinguishes_case() {
        let comparer = NameComparer::case_sensitive();
        assert!(!comparer.equals("Script001.sql", "script001.sql"));
        assert_eq!(comparer.compare("B", "a"), Ordering::Less);
    }

    #[test]
    fn insensitive_orders_by_folded_text() {
        let comparer = NameComparer::case_insensitive();
        assert_eq!(comparer.compare("a", "B"), Ordering::Less);
        assert_eq!(comparer.compare("b", "A"), Ordering::Greater);
    }

    #[test]
    fn contains_uses_policy() {
        let applied = ["Script001.sql", "Script002.sql"];
        assert!(NameComparer::case_insensitive().contains(applied, "script002.sql"));
        assert!(!NameComparer::case_sensitive().contains(applied, "script002.sql"));
    }

    #[test]
    fn non_ascii_names_fold() {
        let comparer = NameComparer::case_insensitive();
        assert!(comparer.equals("Straße_ändern.sql", "STRASSE_ÄNDERN.SQL"));
    }
}
