//! Pipeline definition and builder

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use crate::pipeline::Environment;
use crate::pipeline::agent::AgentType;
use crate::pipeline::errors::ValidationError;
use crate::pipeline::options::{Directive, DirectiveSection};
use crate::pipeline::post::Post;
use crate::pipeline::registry::DirectiveRegistry;
use crate::pipeline::stage::Stage;
use crate::pipeline::types::Validate;
use crate::pipeline::validation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main pipeline structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Agent for pipeline execution
    pub agent: AgentType,

    /// Environment variables
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub environment: Environment,

    /// Pipeline options
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Directive>,

    /// Pipeline triggers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Directive>,

    /// Build parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Directive>,

    /// Tool installations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Directive>,

    /// Stages in pipeline
    pub stages: Vec<Stage>,

    /// Post-conditions for pipeline
    #[serde(default, skip_serializing_if = "Post::is_empty")]
    pub post: Post,
}

impl Validate for Pipeline {
    type Error = Vec<ValidationError>;

    fn validate(&self) -> Result<(), Self::Error> {
        self.validate_with(&DirectiveRegistry::builtin())
    }
}

impl Pipeline {
    /// Creates a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns number of top-level stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Directives of one section
    pub fn directives(&self, section: DirectiveSection) -> &[Directive] {
        match section {
            DirectiveSection::Options => &self.options,
            DirectiveSection::Triggers => &self.triggers,
            DirectiveSection::Parameters => &self.parameters,
            DirectiveSection::Tools => &self.tools,
        }
    }

    /// Validates a programmatically built model against a directive registry.
    ///
    /// # Errors
    ///
    /// Returns every violated rule, in tree order.
    pub fn validate_with(&self, registry: &DirectiveRegistry) -> Result<(), Vec<ValidationError>> {
        let errors = validation::check_pipeline(self, registry);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipeline({}): {} stages", self.agent, self.stages.len())
    }
}

/// Builder for creating pipelines
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline {
                agent: AgentType::Any,
                environment: Environment::new(),
                options: Vec::new(),
                triggers: Vec::new(),
                parameters: Vec::new(),
                tools: Vec::new(),
                stages: Vec::new(),
                post: Post::new(),
            },
        }
    }

    /// Sets agent for pipeline
    pub fn agent(mut self, agent: AgentType) -> Self {
        self.pipeline.agent = agent;
        self
    }

    /// Adds a stage to pipeline
    pub fn stage(mut self, stage: Stage) -> Self {
        self.pipeline.stages.push(stage);
        self
    }

    /// Adds multiple stages to pipeline
    pub fn stages(mut self, mut stages: Vec<Stage>) -> Self {
        self.pipeline.stages.append(&mut stages);
        self
    }

    /// Configures environment with a closure
    pub fn environment<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Environment) -> Environment,
    {
        self.pipeline.environment = f(self.pipeline.environment);
        self
    }

    /// Sets environment directly (convenience method)
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.pipeline.environment = environment;
        self
    }

    /// Adds a directive to a section
    pub fn directive(mut self, section: DirectiveSection, directive: Directive) -> Self {
        match section {
            DirectiveSection::Options => self.pipeline.options.push(directive),
            DirectiveSection::Triggers => self.pipeline.triggers.push(directive),
            DirectiveSection::Parameters => self.pipeline.parameters.push(directive),
            DirectiveSection::Tools => self.pipeline.tools.push(directive),
        }
        self
    }

    /// Adds an option
    pub fn option(self, directive: Directive) -> Self {
        self.directive(DirectiveSection::Options, directive)
    }

    /// Adds a trigger
    pub fn trigger(self, directive: Directive) -> Self {
        self.directive(DirectiveSection::Triggers, directive)
    }

    /// Adds a parameter
    pub fn parameter(self, directive: Directive) -> Self {
        self.directive(DirectiveSection::Parameters, directive)
    }

    /// Adds a tool
    pub fn tool(self, directive: Directive) -> Self {
        self.directive(DirectiveSection::Tools, directive)
    }

    /// Sets the post section
    pub fn post(mut self, post: Post) -> Self {
        self.pipeline.post = post;
        self
    }

    /// Builds pipeline
    #[allow(clippy::missing_errors_doc)]
    pub fn build(self) -> Result<Pipeline, Vec<ValidationError>> {
        self.pipeline.validate()?;
        Ok(self.pipeline)
    }

    /// Builds pipeline, checking directives against a custom registry
    #[allow(clippy::missing_errors_doc)]
    pub fn build_with(self, registry: &DirectiveRegistry) -> Result<Pipeline, Vec<ValidationError>> {
        self.pipeline.validate_with(registry)?;
        Ok(self.pipeline)
    }

    /// Builds pipeline without validation (for internal use)
    #[must_use]
    pub fn build_unchecked(self) -> Pipeline {
        self.pipeline
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
