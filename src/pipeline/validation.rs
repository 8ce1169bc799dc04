//! Model-level rules
//!
//! Two families of checks walk a finished [`Pipeline`]:
//!
//! - invariants that span siblings or scopes (unique stage names, unique
//!   environment names, unique post conditions, matrix reference integrity).
//!   The parser runs these after building the model.
//! - structural rules the parser already enforces while reading a document
//!   (non-empty collections, name limits, directive whitelist). They only
//!   run for models assembled in code, see [`check_pipeline`].

use super::Environment;
use super::EnvValue;
use super::agent::AgentType;
use super::errors::{FieldPath, ValidationError, ValidationErrorKind};
use super::matrix::Matrix;
use super::options::{Directive, DirectiveSection};
use super::pipeline_def::Pipeline;
use super::post::Post;
use super::registry::DirectiveRegistry;
use super::stage::{Stage, StageBody, When, WhenCondition};
use super::steps::{ArgValue, Step};
use crate::document::Position;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Longest accepted stage name, in characters
pub const MAX_STAGE_NAME: usize = 100;

#[allow(clippy::expect_used)]
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Returns true for names usable as variables, axis names and step names
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Source positions of model nodes, keyed by their path in the document
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    positions: HashMap<FieldPath, Position>,
}

impl SourceMap {
    /// Creates an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where a path starts
    pub fn insert(&mut self, path: FieldPath, position: Position) {
        self.positions.entry(path).or_insert(position);
    }

    /// Looks up a path
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<Position> {
        self.positions.get(path).copied()
    }

    /// Number of recorded paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true when nothing is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Runs the cross-cutting invariants over a parsed pipeline.
#[must_use]
pub fn check_invariants(pipeline: &Pipeline, sources: &SourceMap) -> Vec<ValidationError> {
    let mut checker = Checker::new(sources, None);
    checker.pipeline(pipeline);
    checker.errors
}

/// Runs every rule over a pipeline assembled in code.
#[must_use]
pub fn check_pipeline(pipeline: &Pipeline, registry: &DirectiveRegistry) -> Vec<ValidationError> {
    let sources = SourceMap::new();
    let mut checker = Checker::new(&sources, Some(registry));
    checker.pipeline(pipeline);
    checker.errors
}

/// Runs every rule over a single stage subtree, paths relative to `base`.
#[must_use]
pub fn check_stage(stage: &Stage, base: &FieldPath) -> Vec<ValidationError> {
    let sources = SourceMap::new();
    let registry = DirectiveRegistry::builtin();
    let mut checker = Checker::new(&sources, Some(&registry));
    checker.stage(stage, base);
    checker.errors
}

struct Checker<'a> {
    sources: &'a SourceMap,
    /// Set when structural rules apply as well
    registry: Option<&'a DirectiveRegistry>,
    errors: Vec<ValidationError>,
}

impl<'a> Checker<'a> {
    fn new(sources: &'a SourceMap, registry: Option<&'a DirectiveRegistry>) -> Self {
        Self {
            sources,
            registry,
            errors: Vec::new(),
        }
    }

    fn structural(&self) -> bool {
        self.registry.is_some()
    }

    fn report(&mut self, path: FieldPath, kind: ValidationErrorKind) {
        let position = self.sources.get(&path);
        self.errors.push(ValidationError::new(path, kind, position));
    }

    fn describe(&self, path: &FieldPath) -> String {
        match self.sources.get(path) {
            Some(position) => format!("{path} ({position})"),
            None => path.to_string(),
        }
    }

    fn pipeline(&mut self, pipeline: &Pipeline) {
        let root = FieldPath::root();
        if self.structural() {
            self.agent(&pipeline.agent, &root.key("agent"));
            for section in DirectiveSection::ALL {
                self.directives(section, pipeline.directives(section), &root.key(section.as_str()));
            }
            if pipeline.stages.is_empty() {
                self.report(root.key("stages"), ValidationErrorKind::EmptyStages);
            }
        }
        self.environment(&pipeline.environment, &root.key("environment"));
        self.stages(&pipeline.stages, &root.key("stages"));
        self.post(&pipeline.post, &root.key("post"));
    }

    fn stages(&mut self, stages: &[Stage], path: &FieldPath) {
        let mut seen: HashMap<&str, FieldPath> = HashMap::new();
        for (index, stage) in stages.iter().enumerate() {
            let stage_path = path.index(index);
            if !stage.name.is_empty() {
                match seen.get(stage.name.as_str()) {
                    Some(first) => {
                        let first = self.describe(first);
                        self.report(
                            stage_path.clone(),
                            ValidationErrorKind::DuplicateStage {
                                name: stage.name.clone(),
                                first,
                            },
                        );
                    }
                    None => {
                        seen.insert(&stage.name, stage_path.clone());
                    }
                }
            }
            self.stage(stage, &stage_path);
        }
    }

    fn stage(&mut self, stage: &Stage, path: &FieldPath) {
        if self.structural() {
            let length = stage.name.chars().count();
            if stage.name.is_empty() {
                self.report(path.key("name"), ValidationErrorKind::EmptyName);
            } else if length > MAX_STAGE_NAME {
                self.report(
                    path.key("name"),
                    ValidationErrorKind::NameTooLong {
                        max: MAX_STAGE_NAME,
                        len: length,
                    },
                );
            }
            if let Some(agent) = &stage.agent {
                self.agent(agent, &path.key("agent"));
            }
            if let Some(when) = &stage.when {
                self.when(when, &path.key("when"));
            }
            self.directives(DirectiveSection::Options, &stage.options, &path.key("options"));
        }

        self.environment(&stage.environment, &path.key("environment"));

        match &stage.body {
            StageBody::Steps(steps) => {
                if self.structural() {
                    self.steps(steps, &path.key("steps"));
                }
            }
            StageBody::Parallel { stages, .. } => {
                self.children(stages, &path.key("parallel"), "parallel");
            }
            StageBody::Sequential(stages) => {
                self.children(stages, &path.key("stages"), "stages");
            }
            StageBody::Matrix(matrix) => self.matrix(matrix, &path.key("matrix")),
        }

        self.post(&stage.post, &path.key("post"));
    }

    fn children(&mut self, stages: &[Stage], path: &FieldPath, what: &str) {
        if self.structural() && stages.is_empty() {
            self.report(path.clone(), ValidationErrorKind::Empty { what: what.into() });
        }
        self.stages(stages, path);
    }

    fn matrix(&mut self, matrix: &Matrix, path: &FieldPath) {
        let axes_path = path.key("axes");
        if self.structural() {
            if matrix.axes.is_empty() {
                self.report(axes_path.clone(), ValidationErrorKind::Empty { what: "axes".into() });
            }
            for (index, axis) in matrix.axes.iter().enumerate() {
                let axis_path = axes_path.index(index);
                if !is_identifier(&axis.name) {
                    self.report(
                        axis_path.key("name"),
                        ValidationErrorKind::InvalidIdentifier {
                            name: axis.name.clone(),
                        },
                    );
                }
                if axis.values.is_empty() {
                    self.report(axis_path.key("values"), ValidationErrorKind::Empty {
                        what: "values".into(),
                    });
                }
            }
            if let Some(agent) = &matrix.agent {
                self.agent(agent, &path.key("agent"));
            }
        }

        let before = self.errors.len();
        let mut axis_names = HashSet::new();
        for (index, axis) in matrix.axes.iter().enumerate() {
            let axis_path = axes_path.index(index);
            if !axis_names.insert(axis.name.as_str()) {
                self.report(
                    axis_path.key("name"),
                    ValidationErrorKind::InvalidMatrix {
                        reason: format!("duplicate axis '{}'", axis.name),
                    },
                );
            }
            let mut values = HashSet::new();
            for (value_index, value) in axis.values.iter().enumerate() {
                if !values.insert(value.as_str()) {
                    self.report(
                        axis_path.key("values").index(value_index),
                        ValidationErrorKind::InvalidMatrix {
                            reason: format!("duplicate value '{value}' in axis '{}'", axis.name),
                        },
                    );
                }
            }
        }

        let excludes_path = path.key("excludes");
        for (index, exclude) in matrix.excludes.iter().enumerate() {
            for (axis_index, reference) in exclude.axes.iter().enumerate() {
                let reference_path = excludes_path.index(index).index(axis_index);
                if matrix.find_axis(&reference.name).is_none() {
                    self.report(
                        reference_path.key("name"),
                        ValidationErrorKind::InvalidMatrix {
                            reason: format!("exclude references unknown axis '{}'", reference.name),
                        },
                    );
                } else if self.structural() && reference.filter.values().is_empty() {
                    self.report(reference_path, ValidationErrorKind::Empty {
                        what: "exclude values".into(),
                    });
                }
            }
        }

        let well_formed = self.errors.len() == before
            && !matrix.axes.is_empty()
            && matrix.axes.iter().all(|axis| !axis.values.is_empty());
        if well_formed && !matrix.excludes.is_empty() && matrix.combinations().is_empty() {
            let position = if self.sources.get(&excludes_path).is_some() {
                excludes_path
            } else {
                path.clone()
            };
            self.report(position, ValidationErrorKind::InvalidMatrix {
                reason: "excludes remove every axis combination".into(),
            });
        }

        self.children(&matrix.stages, &path.key("stages"), "stages");
    }

    fn environment(&mut self, environment: &Environment, path: &FieldPath) {
        let mut seen = HashSet::new();
        for entry in environment.iter() {
            let entry_path = path.key(entry.name.clone());
            if self.structural() {
                if !is_identifier(&entry.name) {
                    self.report(
                        entry_path.clone(),
                        ValidationErrorKind::InvalidIdentifier {
                            name: entry.name.clone(),
                        },
                    );
                }
                if let EnvValue::Credential(id) = &entry.value
                    && id.as_str().trim().is_empty()
                {
                    self.report(
                        entry_path.clone(),
                        ValidationErrorKind::InvalidCredential {
                            reason: "credential id must not be empty".into(),
                        },
                    );
                }
            }
            if !seen.insert(entry.name.as_str()) {
                self.report(
                    entry_path,
                    ValidationErrorKind::DuplicateEnvironment {
                        name: entry.name.clone(),
                    },
                );
            }
        }
    }

    fn post(&mut self, post: &Post, path: &FieldPath) {
        let mut seen = HashSet::new();
        for block in &post.blocks {
            let block_path = path.key(block.condition.as_str());
            if !seen.insert(block.condition) {
                self.report(
                    block_path.clone(),
                    ValidationErrorKind::DuplicatePostCondition {
                        condition: block.condition.to_string(),
                    },
                );
            }
            if self.structural() {
                self.steps(&block.steps, &block_path);
            }
        }
    }

    fn steps(&mut self, steps: &[Step], path: &FieldPath) {
        if steps.is_empty() {
            self.report(path.clone(), ValidationErrorKind::Empty { what: "steps".into() });
        }
        for (index, step) in steps.iter().enumerate() {
            let step_path = path.index(index);
            if !is_identifier(&step.name) {
                self.report(
                    step_path.clone(),
                    ValidationErrorKind::InvalidIdentifier {
                        name: step.name.clone(),
                    },
                );
            }
            for arg in &step.args {
                if let ArgValue::Block(block) = &arg.value {
                    self.steps(block, &step_path.key("steps"));
                }
            }
        }
    }

    fn when(&mut self, when: &When, path: &FieldPath) {
        if when.conditions.is_empty() {
            self.report(path.clone(), ValidationErrorKind::Empty { what: "when".into() });
        }
        for condition in &when.conditions {
            self.condition(condition, &path.key(condition.keyword()));
        }
    }

    fn condition(&mut self, condition: &WhenCondition, path: &FieldPath) {
        match condition {
            WhenCondition::Branch { branch: text }
            | WhenCondition::Tag { tag: text }
            | WhenCondition::Expression { expression: text } => {
                if text.trim().is_empty() {
                    self.report(path.clone(), ValidationErrorKind::Empty {
                        what: condition.keyword().into(),
                    });
                }
            }
            WhenCondition::Environment { name, .. } => {
                if !is_identifier(name) {
                    self.report(
                        path.key("name"),
                        ValidationErrorKind::InvalidIdentifier { name: name.clone() },
                    );
                }
            }
            WhenCondition::AllOf { conditions } | WhenCondition::AnyOf { conditions } => {
                if conditions.is_empty() {
                    self.report(path.clone(), ValidationErrorKind::Empty {
                        what: condition.keyword().into(),
                    });
                }
                for (index, nested) in conditions.iter().enumerate() {
                    self.condition(nested, &path.index(index).key(nested.keyword()));
                }
            }
            WhenCondition::Not { condition: nested } => {
                self.condition(nested, &path.key(nested.keyword()));
            }
        }
    }

    fn agent(&mut self, agent: &AgentType, path: &FieldPath) {
        let problem = match agent {
            AgentType::Label(label) if label.trim().is_empty() => Some("label must not be empty"),
            AgentType::Docker(config) if config.image.trim().is_empty() => {
                Some("docker image must not be empty")
            }
            _ => None,
        };
        if let Some(problem) = problem {
            self.report(path.clone(), ValidationErrorKind::InvalidAgent(problem.into()));
        }
    }

    fn directives(&mut self, section: DirectiveSection, directives: &[Directive], path: &FieldPath) {
        let Some(registry) = self.registry else {
            return;
        };
        for (index, directive) in directives.iter().enumerate() {
            let kind = match registry.get(section, &directive.name) {
                None => Some(ValidationErrorKind::UnknownDirective {
                    section: section.to_string(),
                    name: directive.name.clone(),
                }),
                Some(spec) => spec.check(directive).err().map(|reason| {
                    ValidationErrorKind::InvalidArguments {
                        name: directive.name.clone(),
                        reason,
                    }
                }),
            };
            if let Some(kind) = kind {
                self.report(path.index(index), kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::matrix::MatrixExclude;
    use crate::pipeline::post::PostCondition;

    fn leaf(name: &str) -> Stage {
        Stage::new(name, vec![Step::echo(name)])
    }

    fn pipeline(stages: Vec<Stage>) -> Pipeline {
        Pipeline::builder().stages(stages).build_unchecked()
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("_BUILD_ID2"));
        assert!(!is_identifier("2FAST"));
        assert!(!is_identifier("with-dash"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_duplicate_stage_names_report_each_repeat() {
        let errors = check_invariants(
            &pipeline(vec![leaf("Build"), leaf("Build"), leaf("Test"), leaf("Build")]),
            &SourceMap::new(),
        );
        let paths: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["stages[1]", "stages[3]"]);
        assert_eq!(
            errors[0].message(),
            "duplicate stage name 'Build' (first defined at stages[0])"
        );
    }

    #[test]
    fn test_duplicate_names_use_source_positions() {
        let mut sources = SourceMap::new();
        let first = FieldPath::root().key("stages").index(0);
        let second = FieldPath::root().key("stages").index(1);
        sources.insert(first, Position::new(3, 5));
        sources.insert(second, Position::new(5, 5));

        let errors = check_invariants(&pipeline(vec![leaf("A"), leaf("A")]), &sources);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position, Some(Position::new(5, 5)));
        assert!(errors[0].message().contains("stages[0] (line 3, column 5)"));
    }

    #[test]
    fn test_same_name_in_different_parents_is_allowed() {
        let stages = vec![
            Stage::parallel("Linux", vec![leaf("Test")]),
            Stage::parallel("Windows", vec![leaf("Test")]),
        ];
        assert!(check_invariants(&pipeline(stages), &SourceMap::new()).is_empty());
    }

    #[test]
    fn test_duplicate_environment_names() {
        let mut pipeline = pipeline(vec![leaf("Build")]);
        pipeline.environment = Environment::new().set("A", "1").set("A", "2");
        let errors = check_invariants(&pipeline, &SourceMap::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "environment.A");
    }

    #[test]
    fn test_duplicate_post_conditions() {
        let stage = leaf("Build").with_post(
            Post::new()
                .on(PostCondition::Always, vec![Step::echo("a")])
                .on(PostCondition::Always, vec![Step::echo("b")]),
        );
        let errors = check_invariants(&pipeline(vec![stage]), &SourceMap::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "stages[0].post.always");
    }

    #[test]
    fn test_matrix_reference_integrity() {
        let matrix = Matrix::new()
            .axis("OS", vec!["linux".into()])
            .exclude(MatrixExclude::default().values("ARCH", vec!["arm".into()]))
            .stage(leaf("Test"));
        let errors = check_invariants(
            &pipeline(vec![Stage::matrix("Grid", matrix)]),
            &SourceMap::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].path.to_string(),
            "stages[0].matrix.excludes[0][0].name"
        );
    }

    #[test]
    fn test_matrix_fully_excluded() {
        let matrix = Matrix::new()
            .axis("OS", vec!["linux".into()])
            .exclude(MatrixExclude::default().values("OS", vec!["linux".into()]))
            .stage(leaf("Test"));
        let errors = check_invariants(
            &pipeline(vec![Stage::matrix("Grid", matrix)]),
            &SourceMap::new(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("every axis combination"));
    }

    #[test]
    fn test_structural_rules_only_for_code_built_models() {
        let broken = pipeline(vec![Stage::new("", vec![])]);
        assert!(check_invariants(&broken, &SourceMap::new()).is_empty());

        let errors = check_pipeline(&broken, &DirectiveRegistry::builtin());
        let kinds: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(kinds, vec!["stages[0].name", "stages[0].steps"]);
    }

    #[test]
    fn test_structural_when_rules() {
        let stage = leaf("Deploy").with_when(When::new(WhenCondition::all_of(vec![])));
        let errors = check_pipeline(&pipeline(vec![stage]), &DirectiveRegistry::builtin());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "stages[0].when.allOf");
    }

    #[test]
    fn test_structural_agent_rules() {
        let stage = leaf("Build").with_agent(AgentType::label(""));
        let errors = check_pipeline(&pipeline(vec![stage]), &DirectiveRegistry::builtin());
        assert!(matches!(errors[0].kind, ValidationErrorKind::InvalidAgent(_)));
    }
}
