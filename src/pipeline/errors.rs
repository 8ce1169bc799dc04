//! Error types for pipeline domain

use crate::document::{LoadError, Position};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// Location of a value inside the document tree, e.g. `stages[0].steps[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns true for the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Removes the last segment.
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Returns a copy with a key appended.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(PathSegment::Key(key.into()));
        path
    }

    /// Returns a copy with an index appended.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.push(PathSegment::Index(index));
        path
    }

    /// The segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What went wrong, independent of where.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The document could not be loaded at all
    #[error("{0}")]
    Load(String),

    /// A node has the wrong shape
    #[error("expected {expected}, found {found}")]
    WrongType {
        /// What the grammar requires here
        expected: String,
        /// What the document contains
        found: String,
    },

    /// A required key is absent
    #[error("missing required key '{key}'")]
    MissingKey {
        /// The missing key
        key: String,
    },

    /// A key that is not part of the grammar at this level
    #[error("unknown key '{key}', expected one of: {}", .allowed.join(", "))]
    UnknownKey {
        /// The offending key
        key: String,
        /// Keys accepted at this level
        allowed: Vec<String>,
    },

    /// Two keys that cannot be combined
    #[error("'{first}' and '{second}' cannot be used together")]
    ConflictingKeys {
        /// First key
        first: String,
        /// Second key
        second: String,
    },

    /// Pipeline must have at least one stage
    #[error("stages must not be empty")]
    EmptyStages,

    /// A collection that must be non-empty is empty
    #[error("{what} must not be empty")]
    Empty {
        /// Description of the collection
        what: String,
    },

    /// Name cannot be empty
    #[error("name cannot be empty")]
    EmptyName,

    /// Name too long
    #[error("name too long: max {max} characters, got {len}")]
    NameTooLong {
        /// Maximum allowed length
        max: usize,
        /// Actual length of the name
        len: usize,
    },

    /// Invalid characters in an identifier
    #[error("invalid identifier '{name}'")]
    InvalidIdentifier {
        /// The invalid name
        name: String,
    },

    /// A stage defines no body
    #[error("stage '{stage}' must define one of: steps, parallel, matrix, stages")]
    MissingStageBody {
        /// Stage name
        stage: String,
    },

    /// A stage mixes a leaf body with a composite one
    #[error("stage '{stage}' defines both '{first}' and '{second}'")]
    ConflictingStageBody {
        /// Stage name
        stage: String,
        /// First body key
        first: String,
        /// Second body key
        second: String,
    },

    /// Duplicate sibling stage name
    #[error("duplicate stage name '{name}' (first defined at {first})")]
    DuplicateStage {
        /// The repeated name
        name: String,
        /// Where the first occurrence lives
        first: String,
    },

    /// Duplicate environment variable in one scope
    #[error("duplicate environment variable '{name}'")]
    DuplicateEnvironment {
        /// Variable name
        name: String,
    },

    /// Duplicate post condition in one scope
    #[error("duplicate post condition '{condition}'")]
    DuplicatePostCondition {
        /// Condition name
        condition: String,
    },

    /// Unrecognized agent type
    #[error("invalid agent: {0}")]
    InvalidAgent(String),

    /// Unrecognized `when` condition
    #[error("unknown when condition '{name}'")]
    UnknownCondition {
        /// Condition name
        name: String,
    },

    /// Unrecognized post condition
    #[error("unknown post condition '{name}'")]
    UnknownPostCondition {
        /// Condition name
        name: String,
    },

    /// Directive not on the whitelist
    #[error("unknown {section} directive '{name}'")]
    UnknownDirective {
        /// `options`, `triggers`, `parameters` or `tools`
        section: String,
        /// Directive name
        name: String,
    },

    /// Directive arguments do not fit the registered shape
    #[error("invalid arguments for '{name}': {reason}")]
    InvalidArguments {
        /// Directive or step name
        name: String,
        /// Reason for validation failure
        reason: String,
    },

    /// A step has an unusable shape
    #[error("invalid step: {reason}")]
    InvalidStep {
        /// Reason for validation failure
        reason: String,
    },

    /// Matrix reference or shape problem
    #[error("invalid matrix: {reason}")]
    InvalidMatrix {
        /// Reason for validation failure
        reason: String,
    },

    /// Invalid credential reference
    #[error("invalid credential reference: {reason}")]
    InvalidCredential {
        /// Reason for validation failure
        reason: String,
    },

    /// Nesting limit hit
    #[error("maximum nesting depth of {max} exceeded")]
    TooDeep {
        /// The configured limit
        max: usize,
    },
}

impl Serialize for ValidationErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single validation problem with its location.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{path}: {kind}{}", display_position(.position.as_ref()))]
pub struct ValidationError {
    /// Where in the tree the problem is
    pub path: FieldPath,
    /// What the problem is
    #[serde(rename = "message")]
    pub kind: ValidationErrorKind,
    /// Where in the text the problem is, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

fn display_position(position: Option<&Position>) -> String {
    position.map_or_else(String::new, |p| format!(" ({p})"))
}

impl ValidationError {
    /// Creates a new error.
    #[must_use]
    pub fn new(path: FieldPath, kind: ValidationErrorKind, position: Option<Position>) -> Self {
        Self {
            path,
            kind,
            position,
        }
    }

    /// The human readable message without location.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<LoadError> for ValidationError {
    fn from(err: LoadError) -> Self {
        Self::new(FieldPath::root(), ValidationErrorKind::Load(err.message), err.position)
    }
}

/// Errors surfaced when composing the core with its collaborators
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline definition could not be fetched
    #[error("failed to fetch pipeline definition: {0}")]
    Scm(#[from] crate::executor::ScmError),

    /// The fetched bytes are not UTF-8 text
    #[error("pipeline definition '{path}' is not valid UTF-8")]
    Encoding {
        /// Path of the definition file
        path: String,
    },

    /// The document is not a valid pipeline
    #[error("pipeline is invalid ({} error(s))", .0.len())]
    Invalid(Vec<ValidationError>),

    /// The runner could not execute the script
    #[error("runner failed: {0}")]
    Runner(#[from] crate::executor::RunnerError),
}

impl From<Vec<ValidationError>> for PipelineError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Invalid(errors)
    }
}
