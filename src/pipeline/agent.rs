//! Agent configuration types
//!
//! This module defines where a pipeline or stage runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for Docker agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    /// Docker image to use
    pub image: String,

    /// Extra arguments passed to `docker run`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,

    /// Run on the node of the enclosing agent instead of a fresh one
    #[serde(default)]
    pub reuse_node: bool,

    /// Pull the image even if it is present locally
    #[serde(default)]
    pub always_pull: bool,
}

impl DockerConfig {
    /// Creates a configuration for an image
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Sets container arguments
    #[must_use]
    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Returns true when only the image is set
    #[must_use]
    pub fn is_image_only(&self) -> bool {
        self.args.is_none() && !self.reuse_node && !self.always_pull
    }
}

/// Types of agents available for pipeline execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Execute on any available agent
    Any,

    /// No global agent; every stage declares its own
    None,

    /// Execute on agent with specific label
    Label(String),

    /// Execute in Docker container
    Docker(DockerConfig),
}

impl AgentType {
    /// Creates an Any agent
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// Creates a None agent
    #[must_use]
    pub fn none() -> Self {
        Self::None
    }

    /// Creates a Label agent
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Creates a Docker agent
    #[must_use]
    pub fn docker(image: impl Into<String>) -> Self {
        Self::Docker(DockerConfig::new(image))
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::None => write!(f, "none"),
            Self::Label(label) => write!(f, "label:{label}"),
            Self::Docker(config) => write!(f, "docker:{}", config.image),
        }
    }
}
