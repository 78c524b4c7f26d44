//! ---
//! ratchet_section: "01-core-functionality"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script text preprocessing applied after materialisation."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::collections::HashMap;

use tracing::debug;

use crate::error::ScriptError;

/// Rewrites script text before it reaches the target.
pub trait ScriptPreprocessor: Send + Sync {
    /// Transform `content`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] when the text cannot be processed.
    fn process(&self, content: &str) -> Result<String, ScriptError>;
}

/// Replaces `$name$` tokens with configured values.
///
/// Names consist of ASCII alphanumerics, `_`, `-` and `.`. A lone `$` or
/// `$$` is left untouched. In strict mode (the default) a token without a
/// value is an error; lenient mode leaves it in place.
#[derive(Debug, Clone, Default)]
pub struct VariableSubstitution {
    variables: HashMap<String, String>,
    lenient: bool,
}

impl VariableSubstitution {
    /// Strict substitution over `variables`.
    pub fn new<I, K, V>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            variables: variables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            lenient: false,
        }
    }

    /// Leave unknown tokens untouched instead of failing.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

impl ScriptPreprocessor for VariableSubstitution {
    fn process(&self, content: &str) -> Result<String, ScriptError> {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;
        while let Some(start) = rest.find('$') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let len = after
                .find(|c: char| !is_variable_char(c))
                .unwrap_or(after.len());
            if len == 0 || !after[len..].starts_with('$') {
                out.push('$');
                rest = after;
                continue;
            }
            let name = &after[..len];
            match self.variables.get(name) {
                Some(value) => out.push_str(value),
                None if self.lenient => {
                    debug!(variable = name, "leaving undefined variable in place");
                    out.push('$');
                    out.push_str(name);
                    out.push('$');
                }
                None => return Err(ScriptError::UndefinedVariable(name.to_owned())),
            }
            rest = &after[len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_tokens() {
        let pre = VariableSubstitution::new([("schema", "app"), ("owner", "svc_user")]);
        let out = pre
            .process("CREATE TABLE $schema$.users (id INT); GRANT ALL TO $owner$;")
            .unwrap();
        assert_eq!(out, "CREATE TABLE app.users (id INT); GRANT ALL TO svc_user;");
    }

    #[test]
    fn undefined_token_fails_in_strict_mode() {
        let pre = VariableSubstitution::new(Vec::<(String, String)>::new());
        let err = pre.process("SELECT * FROM $missing$;").unwrap_err();
        assert!(matches!(err, ScriptError::UndefinedVariable(name) if name == "missing"));
    }

    #[test]
    fn lenient_mode_keeps_unknown_tokens() {
        let pre = VariableSubstitution::new([("a", "1")]).lenient();
        assert_eq!(pre.process("$a$ $b$").unwrap(), "1 $b$");
    }

    #[test]
    fn bare_dollars_pass_through() {
        let pre = VariableSubstitution::new([("x", "y")]);
        assert_eq!(
            pre.process("SELECT $$body$$, '$5 off';").unwrap_err().to_string(),
            "variable `body` has no value defined"
        );
        assert_eq!(pre.process("price $5 and $$").unwrap(), "price $5 and $$");
    }
}
