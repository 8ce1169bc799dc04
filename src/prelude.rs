//! Prelude module for common imports

pub use crate::document::{LoadError, Node, Position};
pub use crate::generator::{RenderOptions, ScriptGenerator, StepRenderers, render};
pub use crate::parser::{ParserConfig, parse_and_validate, parse_and_validate_with};

pub use crate::pipeline::agent::{AgentType, DockerConfig};
pub use crate::pipeline::errors::{PipelineError, ValidationError, ValidationErrorKind};
pub use crate::pipeline::matrix::{Matrix, MatrixExclude};
pub use crate::pipeline::options::{Directive, DirectiveSection};
pub use crate::pipeline::pipeline_def::{Pipeline, PipelineBuilder};
pub use crate::pipeline::post::{Post, PostCondition};
pub use crate::pipeline::registry::{DirectiveRegistry, DirectiveSpec};
pub use crate::pipeline::stage::{Stage, StageBody, StageBuilder, When, WhenCondition};
pub use crate::pipeline::steps::{ArgValue, Argument, Step};
pub use crate::pipeline::types::{BuildResult, Validate};
pub use crate::pipeline::{CredentialId, Environment};

pub use crate::executor::{
    CredentialStore, ExecutionContext, RunOutcome, ScmProvider, ScriptRunner,
};
