//! Document loading
//!
//! Turns raw YAML (or JSON, which is a YAML subset) into a generic,
//! order-preserving [`Node`] tree. This layer knows nothing about pipelines:
//! it only guarantees a well-formed tree of scalars, sequences and mappings
//! with unique keys and source positions.

mod locator;

use locator::Locator;
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, Visitor};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// A 1-based line/column location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// Line number, starting at 1
    pub line: usize,
    /// Column number in characters, starting at 1
    pub column: usize,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The first character of a document.
    #[must_use]
    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error raised when the input is not a well-formed document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LoadError {
    /// Where the syntax error was detected, when the underlying parser knows
    pub position: Option<Position>,
    /// Human readable description
    pub message: String,
}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        let position = err
            .location()
            .map(|loc| Position::new(loc.line(), loc.column()));
        Self {
            position,
            message: err.to_string(),
        }
    }
}

/// A typed scalar value.
///
/// The tag is whatever the document format resolved: `"1"` stays a string
/// while `1` becomes an integer.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `~`, `null` or an empty value
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Any string, quoted or plain
    String(String),
}

impl Scalar {
    /// Short name of the scalar type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Returns the string value if this is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form of the scalar, used where the pipeline format coerces
    /// values to strings (environment values, branch patterns).
    ///
    /// Returns `None` for null.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key, always a string (scalar keys are stringified)
    pub key: String,
    /// Position of the key in the source
    pub key_position: Position,
    /// The value
    pub value: Node,
}

/// Shape of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A leaf value
    Scalar(Scalar),
    /// An ordered list
    Sequence(Vec<Node>),
    /// An ordered list of entries with unique keys
    Mapping(Vec<Entry>),
}

/// A node of the generic document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    position: Position,
}

impl Node {
    /// Creates a node at the given position.
    #[must_use]
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// Creates a scalar node positioned at the start of the document.
    #[must_use]
    pub fn scalar(value: Scalar) -> Self {
        Self::new(NodeKind::Scalar(value), Position::start())
    }

    /// The node's shape.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Where the node starts in the source.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the scalar if this node is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the string value if this node is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Returns the items if this node is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this node is a mapping.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&[Entry]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key in a mapping node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Returns true for a null scalar.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(Scalar::Null))
    }

    /// Short description of the node type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Scalar(s) => s.type_name(),
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }
}

/// Loads a document into a [`Node`] tree.
///
/// # Errors
///
/// Returns a [`LoadError`] on malformed syntax, duplicate keys within one
/// mapping, non-scalar keys, YAML tags or multiple documents in one text.
pub fn load(text: &str) -> Result<Node, LoadError> {
    if is_blank(text) {
        return Ok(Node::scalar(Scalar::Null));
    }

    let mut node: Node = serde_yaml::from_str(text).map_err(|err| {
        let err = LoadError::from(err);
        tracing::debug!(error = %err, "Document failed to load");
        err
    })?;
    Locator::new(text).locate(&mut node);

    tracing::trace!(kind = node.type_name(), "Document loaded");
    Ok(node)
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, sequence or mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::Integer(v)))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::scalar(match i64::try_from(v) {
            Ok(i) => Scalar::Integer(i),
            Err(_) => Scalar::Float(v as f64),
        }))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::scalar(Scalar::String(v)))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::new(NodeKind::Sequence(items), Position::start()))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut seen = HashSet::new();
        while let Some(MappingKey(key)) = map.next_key()? {
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate mapping key `{key}`")));
            }
            let value = map.next_value::<Node>()?;
            entries.push(Entry {
                key,
                key_position: Position::start(),
                value,
            });
        }
        Ok(Node::new(NodeKind::Mapping(entries), Position::start()))
    }

    fn visit_enum<A>(self, _data: A) -> Result<Node, A::Error>
    where
        A: EnumAccess<'de>,
    {
        Err(de::Error::custom("tagged values are not supported"))
    }
}

/// Mapping keys must be scalars; they are stringified.
struct MappingKey(String);

impl<'de> Deserialize<'de> for MappingKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MappingKeyVisitor)
    }
}

struct MappingKeyVisitor;

impl Visitor<'_> for MappingKeyVisitor {
    type Value = MappingKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MappingKey, E> {
        Ok(MappingKey(v))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};

        match &self.kind {
            NodeKind::Scalar(Scalar::Null) => serializer.serialize_unit(),
            NodeKind::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            NodeKind::Scalar(Scalar::Integer(i)) => serializer.serialize_i64(*i),
            NodeKind::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            NodeKind::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            NodeKind::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            NodeKind::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for entry in entries {
                    map.serialize_entry(&entry.key, &entry.value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_preserves_key_order() {
        let node = load("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<&str> = node
            .as_mapping()
            .unwrap()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_keeps_scalar_types() {
        let node = load("quoted: \"1\"\nplain: 1\nflag: true\nratio: 1.5\nnothing: ~\n").unwrap();
        assert_eq!(
            node.get("quoted").unwrap().as_scalar(),
            Some(&Scalar::String("1".to_string()))
        );
        assert_eq!(node.get("plain").unwrap().as_scalar(), Some(&Scalar::Integer(1)));
        assert_eq!(node.get("flag").unwrap().as_scalar(), Some(&Scalar::Bool(true)));
        assert_eq!(node.get("ratio").unwrap().as_scalar(), Some(&Scalar::Float(1.5)));
        assert!(node.get("nothing").unwrap().is_null());
    }

    #[test]
    fn test_load_rejects_duplicate_keys() {
        let err = load("stages: []\nstages: []\n").unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_load_allows_same_key_in_different_mappings() {
        assert!(load("a:\n  name: x\nb:\n  name: y\n").is_ok());
    }

    #[test]
    fn test_load_rejects_unterminated_quote() {
        let err = load("agent: \"any\nstages: []\n").unwrap_err();
        assert!(err.position.is_some());
    }

    #[test]
    fn test_load_rejects_bad_indentation() {
        assert!(load("stages:\n  - name: a\n   steps: []\n").is_err());
    }

    #[test]
    fn test_load_rejects_tags() {
        let err = load("secret: !vault abc\n").unwrap_err();
        assert!(err.message.contains("tagged"));
    }

    #[test]
    fn test_load_rejects_complex_keys() {
        assert!(load("? [a, b]\n: value\n").is_err());
    }

    #[test]
    fn test_load_json() {
        let node = load(r#"{"agent": "any", "stages": [{"name": "Build"}]}"#).unwrap();
        assert_eq!(node.get("agent").unwrap().as_str(), Some("any"));
        assert_eq!(node.get("stages").unwrap().as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn test_load_empty_document_is_null() {
        assert!(load("").unwrap().is_null());
        assert!(load("# only a comment\n").unwrap().is_null());
    }

    #[test]
    fn test_load_attaches_positions() {
        let text = "agent: any\nstages:\n  - name: Build\n    steps:\n      - echo hi\n";
        let node = load(text).unwrap();
        let entries = node.as_mapping().unwrap();
        assert_eq!(entries[0].key_position, Position::new(1, 1));
        assert_eq!(entries[1].key_position, Position::new(2, 1));

        let stage = &node.get("stages").unwrap().as_sequence().unwrap()[0];
        assert_eq!(stage.position(), Position::new(3, 5));
        let step = &stage.get("steps").unwrap().as_sequence().unwrap()[0];
        assert_eq!(step.position(), Position::new(5, 9));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, 7).to_string(), "line 3, column 7");
    }

    #[test]
    fn test_node_serializes_back_to_json() {
        let node = load("b: [1, two]\na: {c: true}\n").unwrap();
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"b":[1,"two"],"a":{"c":true}}"#);
    }
}
