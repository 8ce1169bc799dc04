//! Pipeline domain types and logic

// Make submodules public
pub mod agent;
pub mod errors;
pub mod matrix;
pub mod options;
pub mod pipeline_def;
pub mod post;
pub mod registry;
pub mod stage;
pub mod steps;
pub mod types;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export public types from submodules
pub use agent::{AgentType, DockerConfig};
pub use errors::{FieldPath, PathSegment, PipelineError, ValidationError, ValidationErrorKind};
pub use matrix::{AxisFilter, ExcludeAxis, Matrix, MatrixAxis, MatrixExclude};
pub use options::{Directive, DirectiveSection};
pub use pipeline_def::{Pipeline, PipelineBuilder};
pub use post::{Post, PostBlock, PostCondition};
pub use registry::{DirectiveRegistry, DirectiveSpec};
pub use stage::{Stage, StageBody, StageBuilder, When, WhenCondition};
pub use steps::{ArgValue, Argument, Step};
pub use types::{BuildResult, Validate};
pub use validation::SourceMap;

/// Opaque identifier of a secret held by a credential store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    /// Wraps an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of an environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvValue {
    /// Plain text
    Literal(String),
    /// Reference resolved by the runner, never by the core
    Credential(CredentialId),
}

/// A single `NAME = value` binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    /// Variable name
    pub name: String,
    /// Bound value
    pub value: EnvValue,
}

/// Defines environment variables that can be used in pipeline steps.
///
/// Entries keep declaration order, which is the order they are rendered in.
/// Credential references stay opaque: only their identifier is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Environment {
    /// Bindings in declaration order.
    pub entries: Vec<EnvironmentEntry>,
}

impl Environment {
    /// Creates a new empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal variable.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, EnvValue::Literal(value.into()));
        self
    }

    /// Adds a credential-backed variable.
    #[must_use]
    pub fn credential(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.push(name, EnvValue::Credential(CredentialId::new(id)));
        self
    }

    /// Appends a binding.
    pub fn push(&mut self, name: impl Into<String>, value: EnvValue) {
        self.entries.push(EnvironmentEntry {
            name: name.into(),
            value,
        });
    }

    /// Gets the first binding of a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    /// Iterates over bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentEntry> {
        self.entries.iter()
    }

    /// Credential identifiers referenced by this scope.
    pub fn credentials(&self) -> impl Iterator<Item = &CredentialId> {
        self.entries.iter().filter_map(|entry| match &entry.value {
            EnvValue::Credential(id) => Some(id),
            EnvValue::Literal(_) => None,
        })
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no variable is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
