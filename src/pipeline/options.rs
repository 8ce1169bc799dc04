//! Declarative directives
//!
//! `options`, `triggers`, `parameters` and `tools` all share one shape: an
//! ordered list of named entries with arguments. Which names are accepted is
//! decided by the [`DirectiveRegistry`](super::registry::DirectiveRegistry).

use super::steps::Argument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section a directive belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveSection {
    /// Pipeline or stage options
    Options,
    /// Build triggers
    Triggers,
    /// Build parameters
    Parameters,
    /// Tool installations
    Tools,
}

impl DirectiveSection {
    /// All sections in script order
    pub const ALL: [Self; 4] = [Self::Options, Self::Parameters, Self::Triggers, Self::Tools];

    /// The key used in documents and scripts
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::Triggers => "triggers",
            Self::Parameters => "parameters",
            Self::Tools => "tools",
        }
    }
}

impl fmt::Display for DirectiveSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declarative directive, e.g. `timeout(time: 1, unit: 'HOURS')`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    /// Directive name
    pub name: String,

    /// Arguments in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,
}

impl Directive {
    /// Creates a directive without arguments
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument
    #[must_use]
    pub fn with(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} args)", self.name, self.args.len())
    }
}
