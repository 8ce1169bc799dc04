//! Canonical YAML form of a pipeline
//!
//! Writes a model back out in the document schema the parser reads, so a
//! normalized definition can be stored and parsed again into an equal model.

use crate::pipeline::{
    AgentType, ArgValue, Argument, AxisFilter, Directive, DirectiveSection, EnvValue,
    Environment, Matrix, Pipeline, Post, Stage, StageBody, Step, When, WhenCondition,
};
use serde_yaml::{Mapping, Value};

/// Serializes the pipeline as a YAML document
pub fn to_yaml(pipeline: &Pipeline) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&to_document(pipeline))
}

/// Builds the document tree for a pipeline
#[must_use]
pub fn to_document(pipeline: &Pipeline) -> Value {
    let mut root = Mapping::new();
    root.insert("agent".into(), agent(&pipeline.agent));
    if !pipeline.environment.is_empty() {
        root.insert("environment".into(), environment(&pipeline.environment));
    }
    for section in DirectiveSection::ALL {
        let directives = pipeline.directives(section);
        if !directives.is_empty() {
            root.insert(section.as_str().into(), directive_list(directives));
        }
    }
    root.insert("stages".into(), stages(&pipeline.stages));
    if !pipeline.post.is_empty() {
        root.insert("post".into(), post(&pipeline.post));
    }
    Value::Mapping(root)
}

fn agent(agent: &AgentType) -> Value {
    match agent {
        AgentType::Any => "any".into(),
        AgentType::None => "none".into(),
        AgentType::Label(label) => single("label", label.as_str().into()),
        AgentType::Docker(docker) if docker.is_image_only() => {
            single("docker", docker.image.as_str().into())
        }
        AgentType::Docker(docker) => {
            let mut config = Mapping::new();
            config.insert("image".into(), docker.image.as_str().into());
            if let Some(args) = &docker.args {
                config.insert("args".into(), args.as_str().into());
            }
            if docker.reuse_node {
                config.insert("reuseNode".into(), true.into());
            }
            if docker.always_pull {
                config.insert("alwaysPull".into(), true.into());
            }
            single("docker", Value::Mapping(config))
        }
    }
}

fn environment(environment: &Environment) -> Value {
    let mut mapping = Mapping::new();
    for entry in environment.iter() {
        let value = match &entry.value {
            EnvValue::Literal(text) => text.as_str().into(),
            EnvValue::Credential(id) => single("credentials", id.as_str().into()),
        };
        mapping.insert(entry.name.as_str().into(), value);
    }
    Value::Mapping(mapping)
}

fn directive_list(directives: &[Directive]) -> Value {
    directives
        .iter()
        .map(|directive| invocation(&directive.name, &directive.args))
        .collect()
}

fn stages(stages: &[Stage]) -> Value {
    stages.iter().map(stage).collect()
}

fn stage(stage: &Stage) -> Value {
    let mut mapping = Mapping::new();
    mapping.insert("name".into(), stage.name.as_str().into());
    if let Some(agent) = &stage.agent {
        mapping.insert("agent".into(), self::agent(agent));
    }
    if let Some(when) = &stage.when {
        mapping.insert("when".into(), self::when(when));
    }
    if !stage.environment.is_empty() {
        mapping.insert("environment".into(), environment(&stage.environment));
    }
    if !stage.options.is_empty() {
        mapping.insert("options".into(), directive_list(&stage.options));
    }
    match &stage.body {
        StageBody::Steps(steps) => {
            mapping.insert("steps".into(), step_list(steps));
        }
        StageBody::Parallel { stages, fail_fast } => {
            if *fail_fast {
                mapping.insert("failFast".into(), true.into());
            }
            mapping.insert("parallel".into(), self::stages(stages));
        }
        StageBody::Matrix(matrix) => {
            if matrix.fail_fast {
                mapping.insert("failFast".into(), true.into());
            }
            mapping.insert("matrix".into(), self::matrix(matrix));
        }
        StageBody::Sequential(stages) => {
            mapping.insert("stages".into(), self::stages(stages));
        }
    }
    if !stage.post.is_empty() {
        mapping.insert("post".into(), post(&stage.post));
    }
    Value::Mapping(mapping)
}

fn when(when: &When) -> Value {
    let mut mapping = Mapping::new();
    if when.before_agent {
        mapping.insert("beforeAgent".into(), true.into());
    }
    for condition in &when.conditions {
        if let Value::Mapping(entry) = self::condition(condition) {
            mapping.extend(entry);
        }
    }
    Value::Mapping(mapping)
}

fn condition(condition: &WhenCondition) -> Value {
    let value = match condition {
        WhenCondition::Branch { branch } => branch.as_str().into(),
        WhenCondition::Tag { tag } => tag.as_str().into(),
        WhenCondition::Expression { expression } => expression.as_str().into(),
        WhenCondition::Environment { name, value } => {
            let mut mapping = Mapping::new();
            mapping.insert("name".into(), name.as_str().into());
            mapping.insert("value".into(), value.as_str().into());
            Value::Mapping(mapping)
        }
        WhenCondition::AllOf { conditions } | WhenCondition::AnyOf { conditions } => {
            conditions.iter().map(self::condition).collect()
        }
        WhenCondition::Not { condition } => self::condition(condition),
    };
    single(condition.keyword(), value)
}

fn matrix(matrix: &Matrix) -> Value {
    let mut mapping = Mapping::new();
    let axes = matrix
        .axes
        .iter()
        .map(|axis| {
            let mut entry = Mapping::new();
            entry.insert("name".into(), axis.name.as_str().into());
            entry.insert("values".into(), strings(&axis.values));
            Value::Mapping(entry)
        })
        .collect();
    mapping.insert("axes".into(), axes);

    if !matrix.excludes.is_empty() {
        let excludes = matrix
            .excludes
            .iter()
            .map(|exclude| {
                exclude
                    .axes
                    .iter()
                    .map(|axis| {
                        let mut entry = Mapping::new();
                        entry.insert("name".into(), axis.name.as_str().into());
                        let key = match axis.filter {
                            AxisFilter::Values(_) => "values",
                            AxisFilter::NotValues(_) => "notValues",
                        };
                        entry.insert(key.into(), strings(axis.filter.values()));
                        Value::Mapping(entry)
                    })
                    .collect::<Value>()
            })
            .collect();
        mapping.insert("excludes".into(), excludes);
    }
    if let Some(agent) = &matrix.agent {
        mapping.insert("agent".into(), self::agent(agent));
    }
    mapping.insert("stages".into(), stages(&matrix.stages));
    Value::Mapping(mapping)
}

fn post(post: &Post) -> Value {
    let mut mapping = Mapping::new();
    for block in &post.blocks {
        mapping.insert(block.condition.as_str().into(), step_list(&block.steps));
    }
    Value::Mapping(mapping)
}

fn step_list(steps: &[Step]) -> Value {
    steps.iter().map(|step| invocation(&step.name, &step.args)).collect()
}

/// `{name: args}` in the shortest form that parses back to the same arguments
fn invocation(name: &str, args: &[Argument]) -> Value {
    let keyworded = args.iter().any(|arg| !arg.is_positional());
    let value = match args {
        [] => Value::Null,
        [arg] if arg.is_positional() && !matches!(arg.value, ArgValue::List(_)) => {
            value(&arg.value)
        }
        _ if !keyworded && args.iter().all(|arg| !matches!(arg.value, ArgValue::List(_))) => {
            args.iter().map(|arg| value(&arg.value)).collect()
        }
        _ => {
            // `args` goes where the first positional argument sits, so keywords
            // written before it come back in the same order.
            let mut mapping = Mapping::new();
            for arg in args {
                match &arg.keyword {
                    Some(keyword) => {
                        mapping.insert(keyword.as_str().into(), value(&arg.value));
                    }
                    None if !mapping.contains_key("args") => {
                        let positional = args
                            .iter()
                            .filter(|arg| arg.is_positional())
                            .map(|arg| value(&arg.value))
                            .collect();
                        mapping.insert("args".into(), Value::Sequence(positional));
                    }
                    None => {}
                }
            }
            Value::Mapping(mapping)
        }
    };
    single(name, value)
}

fn value(value: &ArgValue) -> Value {
    match value {
        ArgValue::String(s) => s.as_str().into(),
        ArgValue::Integer(i) => (*i).into(),
        ArgValue::Float(f) => (*f).into(),
        ArgValue::Boolean(b) => (*b).into(),
        ArgValue::List(items) => items.iter().map(self::value).collect(),
        ArgValue::Block(steps) => step_list(steps),
    }
}

fn strings(values: &[String]) -> Value {
    values.iter().map(|value| Value::from(value.as_str())).collect()
}

fn single(key: &str, value: Value) -> Value {
    let mut mapping = Mapping::new();
    mapping.insert(key.into(), value);
    Value::Mapping(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_and_validate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_document() {
        let pipeline = parse_and_validate(
            "agent: any\nstages:\n  - name: Build\n    steps:\n      - echo hello\n",
        )
        .unwrap();
        assert_eq!(
            to_yaml(&pipeline).unwrap(),
            "agent: any\nstages:\n- name: Build\n  steps:\n  - echo: hello\n"
        );
    }

    #[test]
    fn test_ambiguous_strings_stay_strings() {
        let pipeline = parse_and_validate(
            "agent: any\nenvironment:\n  FLAG: 'true'\n  COUNT: '1'\nstages:\n  - name: A\n    steps:\n      - echo: 'null'\n",
        )
        .unwrap();
        let reparsed = parse_and_validate(&to_yaml(&pipeline).unwrap()).unwrap();
        assert_eq!(reparsed, pipeline);
    }

    #[test]
    fn test_keywords_before_args_keep_their_place() {
        let pipeline = parse_and_validate(concat!(
            "agent: any\n",
            "stages:\n",
            "  - name: Package\n",
            "    steps:\n",
            "      - archiveArtifacts:\n",
            "          fingerprint: true\n",
            "          args: ['dist/**']\n",
            "          allowEmptyArchive: false\n",
        ))
        .unwrap();
        let yaml = to_yaml(&pipeline).unwrap();
        let fingerprint = yaml.find("fingerprint:").unwrap();
        let args = yaml.find("args:").unwrap();
        let allow_empty = yaml.find("allowEmptyArchive:").unwrap();
        assert!(fingerprint < args && args < allow_empty, "{yaml}");
        assert_eq!(parse_and_validate(&yaml).unwrap(), pipeline);
    }

    #[test]
    fn test_invocation_forms() {
        let no_args = invocation("deleteDir", &[]);
        assert_eq!(serde_yaml::to_string(&no_args).unwrap(), "deleteDir: null\n");

        let keywords = invocation(
            "timeout",
            &[Argument::keyword("time", 1_i64), Argument::keyword("unit", "HOURS")],
        );
        assert_eq!(
            serde_yaml::to_string(&keywords).unwrap(),
            "timeout:\n  time: 1\n  unit: HOURS\n"
        );

        let mixed = invocation(
            "retry",
            &[
                Argument::positional(3_i64),
                Argument::keyword("conditions", ArgValue::List(vec!["agent".into()])),
            ],
        );
        assert_eq!(
            serde_yaml::to_string(&mixed).unwrap(),
            "retry:\n  args:\n  - 3\n  conditions:\n  - agent\n"
        );
    }
}
