//! Post-build actions
//!
//! This module defines the conditions under which steps run after a
//! pipeline or stage completes.

#![allow(clippy::must_use_candidate)]

use super::steps::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Build outcome a post block reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCondition {
    /// Always execute regardless of result
    Always,
    /// Execute when the result differs from the previous run
    Changed,
    /// Execute when the build recovered from a failure or unstable run
    Fixed,
    /// Execute when the build got worse than the previous run
    Regression,
    /// Execute when the build was aborted
    Aborted,
    /// Execute only on failure
    Failure,
    /// Execute only on success
    Success,
    /// Execute when the build is unstable
    Unstable,
    /// Execute when the build is not successful
    Unsuccessful,
    /// Execute after every other condition
    Cleanup,
}

impl PostCondition {
    /// All conditions, in the order they are documented
    pub const ALL: [Self; 10] = [
        Self::Always,
        Self::Changed,
        Self::Fixed,
        Self::Regression,
        Self::Aborted,
        Self::Failure,
        Self::Success,
        Self::Unstable,
        Self::Unsuccessful,
        Self::Cleanup,
    ];

    /// The keyword used in documents and scripts
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Changed => "changed",
            Self::Fixed => "fixed",
            Self::Regression => "regression",
            Self::Aborted => "aborted",
            Self::Failure => "failure",
            Self::Success => "success",
            Self::Unstable => "unstable",
            Self::Unsuccessful => "unsuccessful",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for PostCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|condition| condition.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Steps guarded by one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostBlock {
    /// The guarding condition
    pub condition: PostCondition,
    /// Steps to run
    pub steps: Vec<Step>,
}

/// Post section of a pipeline or stage, in source order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Post {
    /// Blocks in source order
    pub blocks: Vec<PostBlock>,
}

impl Post {
    /// Creates an empty post section
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block
    #[must_use]
    pub fn on(mut self, condition: PostCondition, steps: Vec<Step>) -> Self {
        self.blocks.push(PostBlock { condition, steps });
        self
    }

    /// Steps for a condition, if declared
    pub fn steps(&self, condition: PostCondition) -> Option<&[Step]> {
        self.blocks
            .iter()
            .find(|block| block.condition == condition)
            .map(|block| block.steps.as_slice())
    }

    /// Returns true when no block is declared
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl fmt::Display for PostBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} steps)", self.condition, self.steps.len())
    }
}
