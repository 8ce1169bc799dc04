//! Stage types for pipeline definition
//!
//! This module defines stage types, `when` guards and the stage builder.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::Environment;
use super::agent::AgentType;
use super::errors::{FieldPath, ValidationError};
use super::matrix::Matrix;
use super::options::Directive;
use super::post::Post;
use super::steps::Step;
use super::types::Validate;
use super::validation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// When conditions for stage execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhenCondition {
    /// Execute only on specific branch
    Branch {
        /// Branch name or pattern
        branch: String,
    },

    /// Execute only on specific tag
    Tag {
        /// Tag name or pattern
        tag: String,
    },

    /// Execute when environment variable matches
    Environment {
        /// Variable name
        name: String,
        /// Expected value
        value: String,
    },

    /// Execute when expression evaluates to true
    Expression {
        /// Boolean expression
        expression: String,
    },

    /// All conditions must be true
    AllOf {
        /// List of conditions
        conditions: Vec<WhenCondition>,
    },

    /// At least one condition must be true
    AnyOf {
        /// List of conditions
        conditions: Vec<WhenCondition>,
    },

    /// Negates a condition
    Not {
        /// The negated condition
        condition: Box<WhenCondition>,
    },
}

impl WhenCondition {
    /// Creates a branch condition
    pub fn branch(branch: impl Into<String>) -> Self {
        Self::Branch {
            branch: branch.into(),
        }
    }

    /// Creates a tag condition
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag { tag: tag.into() }
    }

    /// Creates an environment condition
    pub fn environment(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Environment {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates an expression condition
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression {
            expression: expr.into(),
        }
    }

    /// Creates an all-of condition
    pub fn all_of(conditions: Vec<WhenCondition>) -> Self {
        Self::AllOf { conditions }
    }

    /// Creates an any-of condition
    pub fn any_of(conditions: Vec<WhenCondition>) -> Self {
        Self::AnyOf { conditions }
    }

    /// Creates a negated condition
    pub fn not(condition: WhenCondition) -> Self {
        Self::Not {
            condition: Box::new(condition),
        }
    }

    /// The keyword used in documents and scripts
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Branch { .. } => "branch",
            Self::Tag { .. } => "tag",
            Self::Environment { .. } => "environment",
            Self::Expression { .. } => "expression",
            Self::AllOf { .. } => "allOf",
            Self::AnyOf { .. } => "anyOf",
            Self::Not { .. } => "not",
        }
    }
}

/// Guard of a stage: conditions combined with AND
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct When {
    /// Evaluate before entering the stage agent
    #[serde(default)]
    pub before_agent: bool,

    /// Conditions in source order
    pub conditions: Vec<WhenCondition>,
}

impl When {
    /// Creates a guard from one condition
    pub fn new(condition: WhenCondition) -> Self {
        Self {
            before_agent: false,
            conditions: vec![condition],
        }
    }

    /// Adds a condition
    pub fn and(mut self, condition: WhenCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets `beforeAgent`
    pub fn before_agent(mut self, before_agent: bool) -> Self {
        self.before_agent = before_agent;
        self
    }
}

impl From<WhenCondition> for When {
    fn from(condition: WhenCondition) -> Self {
        Self::new(condition)
    }
}

/// What a stage does: run steps or contain nested stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageBody {
    /// Leaf stage
    Steps(Vec<Step>),

    /// Nested stages run concurrently
    Parallel {
        /// Branches
        stages: Vec<Stage>,
        /// Abort remaining branches when one fails
        #[serde(default)]
        fail_fast: bool,
    },

    /// Nested stages run once per axis combination
    Matrix(Matrix),

    /// Nested stages run in order
    Sequential(Vec<Stage>),
}

impl StageBody {
    /// The document key for this body
    pub fn key(&self) -> &'static str {
        match self {
            Self::Steps(_) => "steps",
            Self::Parallel { .. } => "parallel",
            Self::Matrix(_) => "matrix",
            Self::Sequential(_) => "stages",
        }
    }

    /// Returns true for leaf stages
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Steps(_))
    }

    /// Nested stages of a composite body
    pub fn children(&self) -> &[Stage] {
        match self {
            Self::Steps(_) => &[],
            Self::Parallel { stages, .. } | Self::Sequential(stages) => stages,
            Self::Matrix(matrix) => &matrix.stages,
        }
    }
}

/// A stage in a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Stage name
    pub name: String,

    /// Optional agent override for this stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentType>,

    /// Optional when guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,

    /// Stage-scoped environment
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub environment: Environment,

    /// Stage options
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Directive>,

    /// Steps or nested stages
    pub body: StageBody,

    /// Post-conditions for this stage
    #[serde(default, skip_serializing_if = "Post::is_empty")]
    pub post: Post,
}

impl Validate for Stage {
    type Error = Vec<ValidationError>;

    fn validate(&self) -> Result<(), Self::Error> {
        let errors = validation::check_stage(self, &FieldPath::root());
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Stage {
    /// Creates a leaf stage
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self::with_body(name, StageBody::Steps(steps))
    }

    /// Creates a stage with parallel branches
    pub fn parallel(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self::with_body(
            name,
            StageBody::Parallel {
                stages,
                fail_fast: false,
            },
        )
    }

    /// Creates a matrix stage
    pub fn matrix(name: impl Into<String>, matrix: Matrix) -> Self {
        Self::with_body(name, StageBody::Matrix(matrix))
    }

    /// Creates a stage with sequential nested stages
    pub fn sequential(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self::with_body(name, StageBody::Sequential(stages))
    }

    /// Creates a stage from any body
    pub fn with_body(name: impl Into<String>, body: StageBody) -> Self {
        Self {
            name: name.into(),
            agent: None,
            when: None,
            environment: Environment::new(),
            options: Vec::new(),
            body,
            post: Post::new(),
        }
    }

    /// Sets agent for this stage
    pub fn with_agent(mut self, agent: AgentType) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Sets when guard for this stage
    pub fn with_when(mut self, when: impl Into<When>) -> Self {
        self.when = Some(when.into());
        self
    }

    /// Sets the stage environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the post section
    pub fn with_post(mut self, post: Post) -> Self {
        self.post = post;
        self
    }

    /// Steps of a leaf stage
    pub fn steps(&self) -> Option<&[Step]> {
        match &self.body {
            StageBody::Steps(steps) => Some(steps),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            StageBody::Steps(steps) => write!(f, "Stage({}): {} steps", self.name, steps.len()),
            body => write!(
                f,
                "Stage({}): {} {} stages",
                self.name,
                body.children().len(),
                body.key()
            ),
        }
    }
}

/// Builder for creating stages
pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    /// Creates a new leaf stage builder
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            stage: Stage::new(name, steps),
        }
    }

    /// Replaces the stage body
    pub fn body(mut self, body: StageBody) -> Self {
        self.stage.body = body;
        self
    }

    /// Sets agent for the stage
    pub fn agent(mut self, agent: AgentType) -> Self {
        self.stage.agent = Some(agent);
        self
    }

    /// Sets when guard for the stage
    pub fn when(mut self, when: impl Into<When>) -> Self {
        self.stage.when = Some(when.into());
        self
    }

    /// Adds an environment literal
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.stage.environment = self.stage.environment.set(name, value);
        self
    }

    /// Adds a stage option
    pub fn option(mut self, directive: Directive) -> Self {
        self.stage.options.push(directive);
        self
    }

    /// Adds a step to a leaf stage; ignored for composite stages
    pub fn step(mut self, step: Step) -> Self {
        if let StageBody::Steps(steps) = &mut self.stage.body {
            steps.push(step);
        }
        self
    }

    /// Sets the post section
    pub fn post(mut self, post: Post) -> Self {
        self.stage.post = post;
        self
    }

    /// Builds the stage
    #[allow(clippy::missing_errors_doc)]
    pub fn build(self) -> Result<Stage, Vec<ValidationError>> {
        self.stage.validate()?;
        Ok(self.stage)
    }

    /// Builds the stage without validation (for internal use)
    #[must_use]
    pub fn build_unchecked(self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::super::errors::ValidationErrorKind;
    use super::super::post::PostCondition;
    use super::*;

    #[test]
    fn test_stage_creation() {
        let steps = vec![Step::shell("cargo build")];
        let stage = Stage::new("Build", steps);

        assert_eq!(stage.name, "Build");
        assert_eq!(stage.steps().map(<[Step]>::len), Some(1));
        assert!(stage.agent.is_none());
        assert!(stage.when.is_none());
        assert!(stage.body.is_leaf());
    }

    #[test]
    fn test_stage_validation_empty_name() {
        let stage = Stage::new("", vec![Step::shell("echo")]);
        let errors = stage.validate().unwrap_err();
        assert!(matches!(errors[0].kind, ValidationErrorKind::EmptyName));
    }

    #[test]
    fn test_stage_validation_name_too_long() {
        let long_name = "a".repeat(101);
        let stage = Stage::new(long_name, vec![Step::shell("echo")]);
        let errors = stage.validate().unwrap_err();
        assert!(matches!(
            errors[0].kind,
            ValidationErrorKind::NameTooLong { max: 100, len: 101 }
        ));
    }

    #[test]
    fn test_stage_validation_empty_steps() {
        let errors = Stage::new("Build", vec![]).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "steps");
    }

    #[test]
    fn test_stage_validation_empty_parallel() {
        let errors = Stage::parallel("Tests", vec![]).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "parallel must not be empty");
    }

    #[test]
    fn test_stage_validation_duplicate_branches() {
        let stage = Stage::parallel(
            "Tests",
            vec![
                Stage::new("Unit", vec![Step::shell("make test")]),
                Stage::new("Unit", vec![Step::shell("make it")]),
            ],
        );
        let errors = stage.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ValidationErrorKind::DuplicateStage { .. }));
        assert_eq!(errors[0].path.to_string(), "parallel[1]");
    }

    #[test]
    fn test_stage_with_when() {
        let stage = Stage::new("Deploy", vec![Step::shell("make deploy")])
            .with_when(WhenCondition::branch("main"));
        let when = stage.when.as_ref().unwrap();
        assert_eq!(when.conditions, vec![WhenCondition::branch("main")]);
        assert!(!when.before_agent);
    }

    #[test]
    fn test_stage_display() {
        let stage = Stage::new("Build", vec![Step::shell("cargo build")]);
        assert_eq!(stage.to_string(), "Stage(Build): 1 steps");

        let parallel = Stage::parallel("Tests", vec![stage]);
        assert_eq!(parallel.to_string(), "Stage(Tests): 1 parallel stages");
    }

    #[test]
    fn test_stage_builder() {
        let stage = StageBuilder::new("Build", vec![Step::shell("cargo build")])
            .agent(AgentType::any())
            .when(When::new(WhenCondition::branch("main")).before_agent(true))
            .env("PROFILE", "release")
            .step(Step::echo("done"))
            .post(Post::new().on(PostCondition::Always, vec![Step::echo("done")]))
            .build()
            .unwrap();

        assert_eq!(stage.name, "Build");
        assert!(stage.agent.is_some());
        assert!(stage.when.as_ref().is_some_and(|w| w.before_agent));
        assert_eq!(stage.steps().map(<[Step]>::len), Some(2));
        assert_eq!(stage.environment.len(), 1);
        assert!(!stage.post.is_empty());
    }

    #[test]
    fn test_stage_builder_rejects_bad_env_name() {
        let result = StageBuilder::new("Build", vec![Step::shell("make")])
            .env("NOT VALID", "x")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_body_children() {
        let inner = Stage::new("Inner", vec![Step::echo("x")]);
        let body = StageBody::Sequential(vec![inner.clone()]);
        assert_eq!(body.children(), std::slice::from_ref(&inner));
        assert_eq!(body.key(), "stages");
        assert!(StageBody::Steps(vec![]).children().is_empty());
    }

    #[test]
    fn test_when_condition_keywords() {
        let cond = WhenCondition::not(WhenCondition::any_of(vec![
            WhenCondition::branch("main"),
            WhenCondition::tag("v*"),
        ]));
        assert_eq!(cond.keyword(), "not");
        assert!(matches!(cond, WhenCondition::Not { condition } if condition.keyword() == "anyOf"));
    }

    #[test]
    fn test_when_environment_condition() {
        let cond = WhenCondition::environment("ENVIRONMENT", "production");
        assert!(matches!(cond, WhenCondition::Environment { name, value }
            if name == "ENVIRONMENT" && value == "production"));
    }

    #[test]
    fn test_when_and() {
        let when = When::new(WhenCondition::branch("main"))
            .and(WhenCondition::expression("params.DEPLOY"));
        assert_eq!(when.conditions.len(), 2);
        assert_eq!(when.conditions[1].keyword(), "expression");
    }
}
