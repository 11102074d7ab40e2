//! Data model for the installation pipeline
//!
//! All of these types are created and consumed within a single
//! installation call; nothing persists in process memory across calls.
//! Durable state is only the files written to the target directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

/// A normalized addon source: either a fetchable URL or a local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    Remote(String),
    Local(PathBuf),
}

impl SourceReference {
    /// Whether this reference points at a remote resource
    pub fn is_remote(&self) -> bool {
        matches!(self, SourceReference::Remote(_))
    }
}

impl std::fmt::Display for SourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceReference::Remote(url) => write!(f, "{}", url),
            SourceReference::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A fully downloaded (or locally read) addon package
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Remote or local filename, always with a recognized extension
    pub filename: String,

    /// Complete byte payload
    pub content: Vec<u8>,
}

/// Package kind, decided purely by filename suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// A single `.py` script
    Script,
    /// A `.zip` archive
    Archive,
}

/// Identifiers of newly placed top-level units
///
/// The host's addon registry uses these to enable or open the
/// installed modules; this core never touches the registry itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallOutcome {
    /// Module ids derived from the written destination paths
    pub installed_modules: BTreeSet<String>,
}

impl InstallOutcome {
    /// Create an outcome for a single installed module
    pub fn single(module: impl Into<String>) -> Self {
        let mut installed_modules = BTreeSet::new();
        installed_modules.insert(module.into());
        Self { installed_modules }
    }
}

/// A literal value parsed from an addon's metadata block
///
/// Only literal constants are representable: the metadata extractor
/// never evaluates expressions, calls, or identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Tuples and lists are both represented as sequences
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The string payload, if this value is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Seq(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Descriptive metadata declared by an addon's entry script
///
/// Invariant: always contains a non-empty `name` entry. Construction
/// through [`Metadata::from_entries`] enforces this; absence is an
/// error, not a default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, Value>,
}

impl Metadata {
    /// Build metadata from parsed entries, validating the `name` key
    pub fn from_entries(entries: BTreeMap<String, Value>) -> Result<Self> {
        match entries.get("name") {
            Some(Value::Str(name)) if !name.is_empty() => Ok(Self { entries }),
            Some(_) => Err(Error::malformed_metadata("'name' must be a string")),
            None => Err(Error::malformed_metadata("missing required 'name' entry")),
        }
    }

    /// The addon's declared name
    pub fn name(&self) -> &str {
        match self.entries.get("name") {
            Some(Value::Str(name)) => name,
            // from_entries guarantees the key exists and is a string
            _ => unreachable!("metadata constructed without a name"),
        }
    }

    /// Look up an arbitrary metadata entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_metadata_requires_name() {
        let result = Metadata::from_entries(entries(vec![(
            "author",
            Value::Str("Someone".to_string()),
        )]));
        assert!(matches!(result, Err(Error::MalformedMetadata { .. })));
    }

    #[test]
    fn test_metadata_rejects_non_string_name() {
        let result = Metadata::from_entries(entries(vec![("name", Value::Int(3))]));
        assert!(matches!(result, Err(Error::MalformedMetadata { .. })));
    }

    #[test]
    fn test_metadata_rejects_empty_name() {
        let result = Metadata::from_entries(entries(vec![("name", Value::Str(String::new()))]));
        assert!(matches!(result, Err(Error::MalformedMetadata { .. })));
    }

    #[test]
    fn test_metadata_name_accessor() {
        let metadata = Metadata::from_entries(entries(vec![
            ("name", Value::Str("Node Wrangler".to_string())),
            (
                "version",
                Value::Seq(vec![Value::Int(3), Value::Int(36)]),
            ),
        ]))
        .unwrap();

        assert_eq!(metadata.name(), "Node Wrangler");
        assert_eq!(
            metadata.get("version"),
            Some(&Value::Seq(vec![Value::Int(3), Value::Int(36)]))
        );
        assert!(metadata.get("category").is_none());
    }

    #[test]
    fn test_value_display() {
        let value = Value::Seq(vec![Value::Int(1), Value::Int(0), Value::Int(0)]);
        assert_eq!(value.to_string(), "(1, 0, 0)");
    }

    #[test]
    fn test_metadata_serializes_as_plain_map() {
        let metadata = Metadata::from_entries(entries(vec![
            ("name", Value::Str("Foo".to_string())),
            ("blender", Value::Seq(vec![Value::Int(2), Value::Int(80)])),
        ]))
        .unwrap();

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"blender":[2,80],"name":"Foo"}"#);
    }
}
