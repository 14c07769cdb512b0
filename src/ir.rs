//! Intermediate representation shared by every styling and transformer.
//!
//! A [`Sample`] is an ordered list of [`Turn`]s. Converters build samples
//! fresh from raw records and transformers return new samples instead of
//! mutating their input, so a sample can be handed around by reference
//! without any interior mutability.

use crate::format::FormatKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Metadata key under which transformers record injection markers.
pub const MARKER_KEY: &str = "marker";

/// Speaker of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// System / context prompt
    System,
    /// Human side of the conversation
    User,
    /// Model side of the conversation
    Assistant,
    /// Function or tool output
    Function,
    /// Any other role, keeping its original name
    Other(String),
}

impl Role {
    /// Parses a role name; unknown names become [`Role::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "function" => Self::Function,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the canonical name of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who is speaking
    pub role: Role,
    /// Visible text of the turn
    pub content: String,
    /// Cross-cutting tags that no styling writes as a native field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Turn {
    /// Creates a turn without metadata.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the metadata value for `key`.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns true if the turn carries `marker` under [`MARKER_KEY`].
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.meta(MARKER_KEY) == Some(marker)
    }
}

/// A conversation: turns in the order they were spoken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Ordered turns
    pub turns: Vec<Turn>,
}

impl Sample {
    /// Creates a sample from turns.
    #[must_use]
    pub const fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if the sample has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Iterates over the turns with the given role.
    pub fn turns_with_role<'a>(&'a self, role: &'a Role) -> impl Iterator<Item = &'a Turn> + 'a {
        self.turns.iter().filter(move |t| &t.role == role)
    }
}

impl From<Vec<Turn>> for Sample {
    fn from(turns: Vec<Turn>) -> Self {
        Self::new(turns)
    }
}

/// Where a dataset came from and what was inferred about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Input file
    pub source_path: PathBuf,
    /// Format used to parse the file
    pub detected_format: FormatKind,
    /// Styling used to build the samples
    pub detected_styling: String,
}

/// Samples of one input file plus their provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Samples in input order
    pub samples: Vec<Sample>,
    /// Origin of the samples
    pub provenance: Provenance,
}

impl Dataset {
    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_roundtrip() {
        for name in ["system", "user", "assistant", "function", "tool"] {
            assert_eq!(Role::parse(name).as_str(), name);
        }
        assert_eq!(Role::parse("tool"), Role::Other("tool".to_string()));
    }

    #[test]
    fn test_role_serde() {
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
        assert_eq!(serde_json::to_string(&Role::Other("tool".into())).unwrap(), "\"tool\"");
    }

    #[test]
    fn test_marker_lookup() {
        let turn = Turn::system("be nice").with_metadata(MARKER_KEY, "m1");
        assert!(turn.has_marker("m1"));
        assert!(!turn.has_marker("m2"));
        assert!(!Turn::system("be nice").has_marker("m1"));
    }

    #[test]
    fn test_turns_with_role_keeps_order() {
        let sample = Sample::new(vec![
            Turn::user("a"),
            Turn::assistant("b"),
            Turn::user("c"),
        ]);
        let users: Vec<_> = sample
            .turns_with_role(&Role::User)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(users, ["a", "c"]);
    }
}
