use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns `true` if `name` is usable as a scope identifier in the emitted script.
///
/// A valid identifier starts with an ASCII letter and continues with ASCII
/// alphanumerics or underscores only.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// A validated display name carried by every node of a workflow tree.
///
/// Identifiers are checked once at construction (and again when deserialized),
/// so any `Identifier` value can be spliced into command text as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(Error::configuration(
                &name,
                "identifiers must start with a letter and contain only letters, digits or '_'",
            ))
        }
    }

    /// Wraps a name known to be valid, such as an engine-predefined group.
    pub(crate) fn predefined(name: &'static str) -> Self {
        debug_assert!(is_valid_identifier(name));
        Self(name.to_string())
    }

    /// Builds a derived identifier such as `<name>_<suffix>`.
    pub fn suffixed(&self, suffix: &str) -> Result<Self> {
        Self::new(format!("{}_{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_identifier_accepts_letter_then_word_characters() {
        assert!(is_valid_identifier("NVE"));
        assert!(is_valid_identifier("g"));
        assert!(is_valid_identifier("anchor_group2"));
        assert!(is_valid_identifier("myIndicesGroup"));
    }

    #[test]
    fn is_valid_identifier_rejects_leading_digits_and_punctuation() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1group"));
        assert!(!is_valid_identifier("_hidden"));
        assert!(!is_valid_identifier("my-group"));
        assert!(!is_valid_identifier("my group"));
        assert!(!is_valid_identifier("dump.file"));
    }

    #[test]
    fn new_reports_offending_name_in_configuration_error() {
        let err = Identifier::new("2bad").unwrap_err();
        match err {
            Error::Configuration { node, .. } => assert_eq!(node, "2bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn suffixed_appends_with_underscore() {
        let id = Identifier::new("relax").unwrap();
        assert_eq!(id.suffixed("minimizer").unwrap(), "relax_minimizer");
    }

    #[test]
    fn deserialize_validates_the_name() {
        let ok: Identifier = serde_json::from_str("\"fixA\"").unwrap();
        assert_eq!(ok, "fixA");
        assert!(serde_json::from_str::<Identifier>("\"9fix\"").is_err());
    }
}
