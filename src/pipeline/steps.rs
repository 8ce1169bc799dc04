//! Step types for pipeline stages
//!
//! A step is an opaque named invocation. The parser only checks the shape
//! of its arguments; what a given step name means is up to the renderer.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a step or directive argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgValue {
    /// String literal
    String(String),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Boolean literal
    Boolean(bool),
    /// List of scalar values
    List(Vec<ArgValue>),
    /// Nested steps, rendered as a trailing closure
    Block(Vec<Step>),
}

impl ArgValue {
    /// Returns the string value, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested steps of a block
    pub fn as_block(&self) -> Option<&[Step]> {
        match self {
            Self::Block(steps) => Some(steps),
            _ => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A positional or keyword argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Keyword for named arguments, `None` for positional ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// The value
    pub value: ArgValue,
}

impl Argument {
    /// Creates a positional argument
    pub fn positional(value: impl Into<ArgValue>) -> Self {
        Self {
            keyword: None,
            value: value.into(),
        }
    }

    /// Creates a keyword argument
    pub fn keyword(keyword: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            value: value.into(),
        }
    }

    /// Returns true for positional arguments
    pub fn is_positional(&self) -> bool {
        self.keyword.is_none()
    }
}

/// A single step in a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name, e.g. `sh`, `echo`, `dir`
    pub name: String,

    /// Arguments in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,
}

impl Step {
    /// Creates a step without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Adds a positional argument
    pub fn with_arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(Argument::positional(value));
        self
    }

    /// Adds a keyword argument
    pub fn with_keyword(mut self, keyword: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push(Argument::keyword(keyword, value));
        self
    }

    /// Attaches a block of nested steps
    pub fn with_block(mut self, steps: Vec<Step>) -> Self {
        self.args.push(Argument::keyword("steps", ArgValue::Block(steps)));
        self
    }

    /// Creates a shell command step
    pub fn shell(command: impl Into<String>) -> Self {
        Self::new("sh").with_arg(ArgValue::String(command.into()))
    }

    /// Creates an echo step
    pub fn echo(message: impl Into<String>) -> Self {
        Self::new("echo").with_arg(ArgValue::String(message.into()))
    }

    /// Creates a `script` step holding raw Groovy
    pub fn script(code: impl Into<String>) -> Self {
        Self::new("script").with_arg(ArgValue::String(code.into()))
    }

    /// Arguments rendered inside the call parentheses
    pub fn call_args(&self) -> impl Iterator<Item = &Argument> {
        self.args
            .iter()
            .filter(|arg| !matches!(arg.value, ArgValue::Block(_)))
    }

    /// The nested block, if the step has one
    pub fn block(&self) -> Option<&[Step]> {
        self.args.iter().find_map(|arg| arg.value.as_block())
    }

    /// Positional arguments in order
    pub fn positional(&self) -> impl Iterator<Item = &ArgValue> {
        self.args
            .iter()
            .filter(|arg| arg.is_positional())
            .map(|arg| &arg.value)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(block) = self.block() {
            write!(f, " {{{} steps}}", block.len())?;
        }
        Ok(())
    }
}
