//! Core types for pipeline domain
//!
//! This module contains small shared types used across the model
//! and by the execution collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse outcome reported by a runner for a whole build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildResult {
    /// Execution completed successfully
    Success,
    /// Execution failed
    Failure,
    /// Execution completed with unstable state
    Unstable,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Unstable => write!(f, "UNSTABLE"),
        }
    }
}

/// Trait for types that can be validated
#[allow(clippy::missing_errors_doc)]
pub trait Validate {
    /// Type of validation error
    type Error;

    /// Validates this type
    fn validate(&self) -> std::result::Result<(), Self::Error>;
}
