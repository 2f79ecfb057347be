//! Serializable addresses into the state tree.
//!
//! A [`Path`] is a sequence of [`Key`] selectors walked from the root. It
//! prints as a compact string: map entries use dot notation (`.players`) and
//! list elements use bracket notation (`[2]`), so `.players[1].hand` selects
//! the `hand` field of the second player. The root itself prints as `.`.

use super::tree::NodeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while converting between handles and paths.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PathError {
    #[error("Node {0} is not reachable from the root")]
    NotFound(NodeId),

    #[error("Invalid path '{path}': segment '{segment}' is absent")]
    InvalidPath { path: String, segment: String },

    #[error("Malformed path '{0}'")]
    Parse(String),

    #[error("The root node has no containing key")]
    RootHasNoKey,
}

/// One step of a path: a named map entry or a list position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Field(String),
}

impl Key {
    /// Whether this key survives a round trip through the string notation.
    pub fn is_addressable(&self) -> bool {
        match self {
            Self::Index(_) => true,
            Self::Field(name) => {
                !name.is_empty() && !name.contains(|c| matches!(c, '.' | '[' | ']'))
            }
        }
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Field(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Field(name) => write!(f, ".{name}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Address of a node, as a sequence of selectors from the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Key>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Extend this path by one selector, returning the new path.
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// Split into the containing path and the final selector.
    ///
    /// Returns `None` for the root path.
    pub fn split_last(&self) -> Option<(Path, &Key)> {
        let (last, rest) = self.0.split_last()?;
        Some((Path(rest.to_vec()), last))
    }

    /// Whether `self` is `other` or lies underneath it.
    pub fn starts_with(&self, other: &Path) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for key in &self.0 {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let malformed = || PathError::Parse(s.to_string());
        let mut keys = Vec::new();
        let mut rest = s;

        while let Some(first) = rest.chars().next() {
            match first {
                '.' => {
                    let body = &rest[1..];
                    let end = body
                        .find(|c| c == '.' || c == '[')
                        .unwrap_or(body.len());
                    let field = &body[..end];
                    if field.is_empty() || field.contains(']') {
                        return Err(malformed());
                    }
                    keys.push(Key::Field(field.to_string()));
                    rest = &body[end..];
                }
                '[' => {
                    let close = rest.find(']').ok_or_else(malformed)?;
                    let index = rest[1..close].parse::<usize>().map_err(|_| malformed())?;
                    keys.push(Key::Index(index));
                    rest = &rest[close + 1..];
                }
                _ => return Err(malformed()),
            }
        }

        Ok(Self(keys))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_prints_as_dot() {
        assert_eq!(Path::root().to_string(), ".");
        assert_eq!("".parse::<Path>().unwrap(), Path::root());
        assert_eq!(".".parse::<Path>().unwrap(), Path::root());
    }

    #[test]
    fn mixed_path_parses() {
        let path: Path = ".players[1].hand[0][2]".parse().unwrap();
        assert_eq!(
            path.keys(),
            &[
                Key::from("players"),
                Key::Index(1),
                Key::from("hand"),
                Key::Index(0),
                Key::Index(2),
            ]
        );
        assert_eq!(path.to_string(), ".players[1].hand[0][2]");
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for raw in ["players", ".a..b", ".a[x]", ".a[1", "[", ".a]"] {
            assert!(
                matches!(raw.parse::<Path>(), Err(PathError::Parse(_))),
                "{raw} should not parse"
            );
        }
    }

    #[test]
    fn split_last_separates_container_and_key() {
        let path: Path = ".zones.deck[3]".parse().unwrap();
        let (container, key) = path.split_last().unwrap();
        assert_eq!(container.to_string(), ".zones.deck");
        assert_eq!(key, &Key::Index(3));
        assert!(Path::root().split_last().is_none());
    }

    #[test]
    fn addressable_keys() {
        assert!(Key::from("hand").is_addressable());
        assert!(Key::Index(0).is_addressable());
        assert!(!Key::from("").is_addressable());
        assert!(!Key::from("a.b").is_addressable());
        assert!(!Key::from("a[0]").is_addressable());
    }

    #[test]
    fn keys_serialize_untagged() {
        assert_eq!(serde_json::to_string(&Key::Index(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&Key::from("deck")).unwrap(), "\"deck\"");
        let key: Key = serde_json::from_str("7").unwrap();
        assert_eq!(key, Key::Index(7));
    }

    #[test]
    fn path_serializes_as_string() {
        let path: Path = ".a[0].b".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\".a[0].b\"");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
