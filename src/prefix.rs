//! Custom prefix spellings.
//!
//! clap only knows `-`/`--`. A parameter declared with prefix `+` is registered
//! with clap under the long name `++name` (reached as `--++name`) and the
//! alias `+s` for its short form. Tokens spelled the external way are rewritten
//! before parsing, using the table of the command level they fall in, and every
//! message clap renders is mapped back.

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::ConfigError;
use crate::marker::PrefixSpec;

/// The prefix every parameter gets unless it declares its own.
pub const DEFAULT_PREFIX: char = '-';

/// Validate a declared prefix and return its character.
pub(crate) fn prefix_of(param: &str, spec: &PrefixSpec) -> Result<char, ConfigError> {
    let invalid = |prefix: &str, reason| ConfigError::InvalidPrefix {
        param: param.to_string(),
        prefix: prefix.to_string(),
        reason,
    };
    match spec {
        PrefixSpec::Default => Ok(DEFAULT_PREFIX),
        PrefixSpec::Unset => Err(invalid("", "it is not set")),
        PrefixSpec::Set(prefix) => {
            let mut chars = prefix.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Err(invalid(prefix, "it is an empty string")),
                (Some(_), Some(_)) => Err(invalid(prefix, "it consists of more than one character")),
                (Some(ch), None) => Ok(ch),
            }
        }
    }
}

/// Validate a declared short name and return its character.
pub(crate) fn short_of(param: &str, short: Option<&str>) -> Result<Option<char>, ConfigError> {
    let Some(short) = short else {
        return Ok(None);
    };
    let invalid = |reason| ConfigError::InvalidShort {
        param: param.to_string(),
        short: short.to_string(),
        reason,
    };
    let mut chars = short.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(invalid("it is an empty string")),
        (Some(_), Some(_)) => Err(invalid("it consists of more than one character")),
        (Some(ch), None) if !ch.is_alphabetic() => Err(invalid("it is not an alphabet character")),
        (Some(ch), None) => Ok(Some(ch)),
    }
}

/// The prefix characters recognized at one command level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset(BTreeSet<char>);

impl Charset {
    pub(crate) fn new(prefixes: impl IntoIterator<Item = char>) -> Self {
        let mut set: BTreeSet<char> = prefixes.into_iter().collect();
        if set.is_empty() {
            set.insert(DEFAULT_PREFIX);
        }
        Self(set)
    }

    pub fn contains(&self, prefix: char) -> bool {
        self.0.contains(&prefix)
    }

    pub fn as_string(&self) -> String {
        self.0.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spelling {
    external: String,
    internal: String,
    /// Short option spelling that may carry its value attached (`+n5`).
    attached: bool,
}

/// External-to-internal spelling table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Spellings {
    entries: Vec<Spelling>,
}

impl Spellings {
    /// Record that `external` (e.g. `++x`) reaches clap as `--{internal_long}`.
    pub(crate) fn add(&mut self, external: String, internal_long: &str, attached: bool) {
        self.insert(Spelling {
            external,
            internal: format!("--{internal_long}"),
            attached,
        });
    }

    fn insert(&mut self, spelling: Spelling) {
        if !self.entries.contains(&spelling) {
            self.entries.push(spelling);
            self.entries
                .sort_by(|a, b| b.external.len().cmp(&a.external.len()));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn extend(&mut self, other: &Spellings) {
        for spelling in &other.entries {
            self.insert(spelling.clone());
        }
    }

    /// The internal spelling of `token`, if it uses one of the table's spellings.
    pub(crate) fn rewrite_token(&self, token: &str) -> Option<String> {
        for spelling in &self.entries {
            let Some(rest) = token.strip_prefix(spelling.external.as_str()) else {
                continue;
            };
            let rewritten = if rest.is_empty() || rest.starts_with('=') {
                format!("{}{rest}", spelling.internal)
            } else if spelling.attached {
                format!("{}={rest}", spelling.internal)
            } else {
                continue;
            };
            trace!(%token, %rewritten, "rewrote custom prefix token");
            return Some(rewritten);
        }
        None
    }

    /// Map internal spellings in a rendered message back to what the user types.
    pub(crate) fn restore(&self, message: &str) -> String {
        let mut entries: Vec<&Spelling> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.internal.len().cmp(&a.internal.len()));
        entries
            .into_iter()
            .fold(message.to_string(), |text, spelling| {
                text.replace(&spelling.internal, &spelling.external)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> Spellings {
        let mut spellings = Spellings::default();
        spellings.add("++x".into(), "++x", false);
        spellings.add("++xy".into(), "++xy", false);
        spellings.add("+n".into(), "+n", true);
        spellings
    }

    fn tokens(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn short_validation_names_the_defect() {
        let reason = |short: &str| match short_of("x", Some(short)) {
            Err(ConfigError::InvalidShort { reason, .. }) => reason,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(reason(""), "it is an empty string");
        assert_eq!(reason("ab"), "it consists of more than one character");
        assert_eq!(reason("1"), "it is not an alphabet character");
        assert_eq!(reason("-"), "it is not an alphabet character");
        assert_eq!(short_of("x", Some("a")).unwrap(), Some('a'));
        assert_eq!(short_of("x", None).unwrap(), None);
    }

    #[test]
    fn prefix_validation_names_the_defect() {
        let reason = |spec: PrefixSpec| match prefix_of("x", &spec) {
            Err(ConfigError::InvalidPrefix { reason, .. }) => reason,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(reason(PrefixSpec::Unset), "it is not set");
        assert_eq!(reason(PrefixSpec::Set(String::new())), "it is an empty string");
        assert_eq!(
            reason(PrefixSpec::Set("--".into())),
            "it consists of more than one character"
        );
        assert_eq!(prefix_of("x", &PrefixSpec::Set("+".into())).unwrap(), '+');
        assert_eq!(prefix_of("x", &PrefixSpec::Default).unwrap(), '-');
    }

    #[test]
    fn rewrites_only_declared_spellings() {
        let table = table();
        let rewritten: Vec<String> = tokens("++x ++xy ++x=1 +n5 +n 6 ++z --x")
            .into_iter()
            .map(|token| table.rewrite_token(&token).unwrap_or(token))
            .collect();
        assert_eq!(rewritten, tokens("--++x --++xy --++x=1 --+n=5 --+n 6 ++z --x"));
    }

    #[test]
    fn extend_merges_tables() {
        let mut merged = Spellings::default();
        merged.extend(&table());
        merged.extend(&table());
        assert_eq!(merged.entries.len(), 3);
        assert_eq!(merged.rewrite_token("++xy").as_deref(), Some("--++xy"));
    }

    #[test]
    fn restores_messages() {
        assert_eq!(
            table().restore("unexpected argument '--++xy' found; see --++x or --+n"),
            "unexpected argument '++xy' found; see ++x or +n"
        );
    }

    #[test]
    fn charset_defaults_to_dash() {
        assert_eq!(Charset::new([]).as_string(), "-");
        assert_eq!(Charset::new(['+', '-', '+']).as_string(), "+-");
    }
}
