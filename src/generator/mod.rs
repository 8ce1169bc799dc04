//! Script generation
//!
//! Renders a validated [`Pipeline`] as a declarative `pipeline { }` script.
//! Output is deterministic: everything is emitted in model order with fixed
//! indentation, so equal models always render to identical text.

pub mod document;
pub mod groovy;
pub mod steps;
pub mod writer;

#[cfg(test)]
mod generator_tests;

use crate::pipeline::{
    AgentType, AxisFilter, Directive, DirectiveRegistry, DirectiveSection, EnvValue,
    Environment, ExcludeAxis, Matrix, Pipeline, Post, Stage, StageBody, When, WhenCondition,
};
use serde::{Deserialize, Serialize};

pub use document::{to_document, to_yaml};
pub use steps::{RenderFn, StepRenderers};
pub use writer::ScriptWriter;

/// Layout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

/// Renders pipelines with the default layout and renderers
#[must_use]
pub fn render(pipeline: &Pipeline) -> String {
    ScriptGenerator::new().render(pipeline)
}

/// Formats a credential reference as a lookup expression
#[must_use]
pub fn credential_lookup(id: &str) -> String {
    format!("credentials({})", groovy::string(id))
}

/// Pipeline script renderer
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    options: RenderOptions,
    renderers: StepRenderers,
    registry: DirectiveRegistry,
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptGenerator {
    /// Creates a generator with the built-in step renderers and directives
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: RenderOptions::default(),
            renderers: StepRenderers::builtin(),
            registry: DirectiveRegistry::builtin(),
        }
    }

    /// Creates a generator with the given layout
    #[must_use]
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::new()
        }
    }

    /// Replaces the step renderer table
    #[must_use]
    pub fn renderers(mut self, renderers: StepRenderers) -> Self {
        self.renderers = renderers;
        self
    }

    /// Replaces the directive registry consulted for wrapped directives
    #[must_use]
    pub fn registry(mut self, registry: DirectiveRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Renders the pipeline.
    ///
    /// The model is assumed to be valid; nothing is re-checked here.
    #[must_use]
    pub fn render(&self, pipeline: &Pipeline) -> String {
        tracing::debug!(
            stages = pipeline.stage_count(),
            indent = self.options.indent,
            "Rendering pipeline script"
        );

        let mut w = ScriptWriter::new(self.options.indent);
        w.block("pipeline", |w| {
            self.agent(&pipeline.agent, w);
            self.environment(&pipeline.environment, w);
            for section in DirectiveSection::ALL {
                self.directives(section, pipeline.directives(section), w);
            }
            w.block("stages", |w| self.stages(&pipeline.stages, w));
            self.post(&pipeline.post, w);
        });
        w.finish()
    }

    fn agent(&self, agent: &AgentType, w: &mut ScriptWriter) {
        match agent {
            AgentType::Any => w.line("agent any"),
            AgentType::None => w.line("agent none"),
            AgentType::Label(label) => {
                w.block("agent", |w| w.line(&format!("label {}", groovy::string(label))));
            }
            AgentType::Docker(docker) if docker.is_image_only() => w.block("agent", |w| {
                w.line(&format!("docker {}", groovy::string(&docker.image)));
            }),
            AgentType::Docker(docker) => w.block("agent", |w| {
                w.block("docker", |w| {
                    w.line(&format!("image {}", groovy::string(&docker.image)));
                    if let Some(args) = &docker.args {
                        w.line(&format!("args {}", groovy::string(args)));
                    }
                    if docker.reuse_node {
                        w.line("reuseNode true");
                    }
                    if docker.always_pull {
                        w.line("alwaysPull true");
                    }
                });
            }),
        }
    }

    fn environment(&self, environment: &Environment, w: &mut ScriptWriter) {
        if environment.is_empty() {
            return;
        }
        w.block("environment", |w| {
            for entry in environment.iter() {
                let value = match &entry.value {
                    EnvValue::Literal(text) => groovy::string(text),
                    EnvValue::Credential(id) => credential_lookup(id.as_str()),
                };
                w.line(&format!("{} = {value}", entry.name));
            }
        });
    }

    fn directives(&self, section: DirectiveSection, directives: &[Directive], w: &mut ScriptWriter) {
        if directives.is_empty() {
            return;
        }
        w.block(section.as_str(), |w| {
            for directive in directives {
                w.line(&self.directive(section, directive));
            }
        });
    }

    fn directive(&self, section: DirectiveSection, directive: &Directive) -> String {
        let args = groovy::arguments(&directive.args);
        let wrap = self
            .registry
            .get(section, &directive.name)
            .and_then(|spec| spec.wrap.as_deref());
        if let Some(wrap) = wrap {
            return format!("{}({wrap}({args}))", directive.name);
        }
        match (section, directive.args.as_slice()) {
            (DirectiveSection::Tools, [arg]) if arg.is_positional() => {
                format!("{} {}", directive.name, groovy::value(&arg.value))
            }
            _ => format!("{}({args})", directive.name),
        }
    }

    fn stages(&self, stages: &[Stage], w: &mut ScriptWriter) {
        for stage in stages {
            self.stage(stage, w);
        }
    }

    fn stage(&self, stage: &Stage, w: &mut ScriptWriter) {
        tracing::trace!(stage = %stage.name, body = stage.body.key(), "Rendering stage");
        let header = format!("stage({})", groovy::string(&stage.name));
        w.block(&header, |w| {
            if let Some(agent) = &stage.agent {
                self.agent(agent, w);
            }
            self.environment(&stage.environment, w);
            self.directives(DirectiveSection::Options, &stage.options, w);
            if let Some(when) = &stage.when {
                self.when(when, w);
            }
            match &stage.body {
                StageBody::Steps(steps) => {
                    w.block("steps", |w| self.renderers.render_all(steps, w));
                }
                StageBody::Parallel { stages, fail_fast } => {
                    if *fail_fast {
                        w.line("failFast true");
                    }
                    w.block("parallel", |w| self.stages(stages, w));
                }
                StageBody::Matrix(matrix) => self.matrix(matrix, w),
                StageBody::Sequential(stages) => w.block("stages", |w| self.stages(stages, w)),
            }
            self.post(&stage.post, w);
        });
    }

    fn when(&self, when: &When, w: &mut ScriptWriter) {
        w.block("when", |w| {
            if when.before_agent {
                w.line("beforeAgent true");
            }
            for condition in &when.conditions {
                self.condition(condition, w);
            }
        });
    }

    fn condition(&self, condition: &WhenCondition, w: &mut ScriptWriter) {
        match condition {
            WhenCondition::Branch { branch } => w.line(&format!("branch {}", groovy::string(branch))),
            WhenCondition::Tag { tag } => w.line(&format!("tag {}", groovy::string(tag))),
            WhenCondition::Environment { name, value } => w.line(&format!(
                "environment name: {}, value: {}",
                groovy::string(name),
                groovy::string(value)
            )),
            WhenCondition::Expression { expression } => {
                let expression = expression.trim();
                if expression.contains('\n') {
                    w.block("expression", |w| {
                        for line in expression.lines() {
                            w.line(line.trim_end());
                        }
                    });
                } else {
                    w.line(&format!("expression {{ {expression} }}"));
                }
            }
            WhenCondition::AllOf { conditions } | WhenCondition::AnyOf { conditions } => {
                w.block(condition.keyword(), |w| {
                    for nested in conditions {
                        self.condition(nested, w);
                    }
                });
            }
            WhenCondition::Not { condition } => w.block("not", |w| self.condition(condition, w)),
        }
    }

    fn matrix(&self, matrix: &Matrix, w: &mut ScriptWriter) {
        if matrix.fail_fast {
            w.line("failFast true");
        }
        w.block("matrix", |w| {
            if let Some(agent) = &matrix.agent {
                self.agent(agent, w);
            }
            w.block("axes", |w| {
                for axis in &matrix.axes {
                    w.block("axis", |w| {
                        w.line(&format!("name {}", groovy::string(&axis.name)));
                        w.line(&format!("values {}", value_list(&axis.values)));
                    });
                }
            });
            if !matrix.excludes.is_empty() {
                w.block("excludes", |w| {
                    for exclude in &matrix.excludes {
                        w.block("exclude", |w| {
                            for axis in &exclude.axes {
                                exclude_axis(axis, w);
                            }
                        });
                    }
                });
            }
            w.block("stages", |w| self.stages(&matrix.stages, w));
        });
    }

    fn post(&self, post: &Post, w: &mut ScriptWriter) {
        if post.is_empty() {
            return;
        }
        w.block("post", |w| {
            for block in &post.blocks {
                w.block(block.condition.as_str(), |w| {
                    self.renderers.render_all(&block.steps, w);
                });
            }
        });
    }
}

fn exclude_axis(axis: &ExcludeAxis, w: &mut ScriptWriter) {
    w.block("axis", |w| {
        w.line(&format!("name {}", groovy::string(&axis.name)));
        let keyword = match axis.filter {
            AxisFilter::Values(_) => "values",
            AxisFilter::NotValues(_) => "notValues",
        };
        w.line(&format!("{keyword} {}", value_list(axis.filter.values())));
    });
}

fn value_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| groovy::string(value))
        .collect::<Vec<_>>()
        .join(", ")
}
