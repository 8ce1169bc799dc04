use super::*;
use crate::parser::parse_and_validate;
use crate::pipeline::{Argument, DirectiveSpec, PostCondition, StageBuilder, Step};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn parse(text: &str) -> Pipeline {
    match parse_and_validate(text) {
        Ok(pipeline) => pipeline,
        Err(errors) => panic!("unexpected errors: {errors:#?}"),
    }
}

const FULL: &str = r#"
pipeline:
  agent:
    label: linux
  environment:
    APP: demo
    TOKEN:
      credentials: test-credentials
  options:
    - timestamps
    - timeout:
        time: 1
        unit: HOURS
    - buildDiscarder:
        numToKeepStr: '10'
  parameters:
    - string:
        name: TARGET
        defaultValue: staging
  triggers:
    - cron: H 4 * * 1-5
  tools:
    - maven: M3
  stages:
    - name: Checkout
      steps:
        - checkout scm
    - name: Build
      agent:
        docker:
          image: maven:3
          args: -v /tmp:/tmp
          reuseNode: true
      steps:
        - sh: mvn -B package
        - archiveArtifacts:
            artifacts: target/*.jar
            fingerprint: true
    - name: Tests
      failFast: true
      parallel:
        - name: Unit
          steps:
            - sh make test
        - name: Lint
          steps:
            - sh make lint
    - name: Deploy
      when:
        beforeAgent: true
        branch: main
        not:
          environment:
            name: SKIP_DEPLOY
            value: 'true'
      steps:
        - script: |
            def target = params.TARGET
            echo "Deploying to ${target}"
  post:
    always:
      - echo done
    failure:
      - mail:
          to: team@example.com
          subject: Build failed
"#;

const FULL_SCRIPT: &str = "\
pipeline {
    agent {
        label 'linux'
    }
    environment {
        APP = 'demo'
        TOKEN = credentials('test-credentials')
    }
    options {
        timestamps()
        timeout(time: 1, unit: 'HOURS')
        buildDiscarder(logRotator(numToKeepStr: '10'))
    }
    parameters {
        string(name: 'TARGET', defaultValue: 'staging')
    }
    triggers {
        cron('H 4 * * 1-5')
    }
    tools {
        maven 'M3'
    }
    stages {
        stage('Checkout') {
            steps {
                checkout scm
            }
        }
        stage('Build') {
            agent {
                docker {
                    image 'maven:3'
                    args '-v /tmp:/tmp'
                    reuseNode true
                }
            }
            steps {
                sh 'mvn -B package'
                archiveArtifacts(artifacts: 'target/*.jar', fingerprint: true)
            }
        }
        stage('Tests') {
            failFast true
            parallel {
                stage('Unit') {
                    steps {
                        sh 'make test'
                    }
                }
                stage('Lint') {
                    steps {
                        sh 'make lint'
                    }
                }
            }
        }
        stage('Deploy') {
            when {
                beforeAgent true
                branch 'main'
                not {
                    environment name: 'SKIP_DEPLOY', value: 'true'
                }
            }
            steps {
                script {
                    def target = params.TARGET
                    echo \"Deploying to ${target}\"
                }
            }
        }
    }
    post {
        always {
            echo 'done'
        }
        failure {
            mail(to: 'team@example.com', subject: 'Build failed')
        }
    }
}
";

#[test]
fn test_full_pipeline_script() {
    let pipeline = parse(FULL);
    assert_eq!(render(&pipeline), FULL_SCRIPT);
}

#[test]
fn test_rendering_is_deterministic() {
    let pipeline = parse(FULL);
    let generator = ScriptGenerator::new();
    assert_eq!(generator.render(&pipeline), generator.render(&pipeline));
    assert_eq!(render(&parse(FULL)), render(&pipeline));
}

#[test]
fn test_minimal_scenario() {
    let script = render(&parse(
        "{agent: any, stages: [{name: Build, steps: [\"echo hello\"]}]}",
    ));
    assert_eq!(
        script,
        "\
pipeline {
    agent any
    stages {
        stage('Build') {
            steps {
                echo 'hello'
            }
        }
    }
}
"
    );
}

#[test]
fn test_unclosed_interpolation_stays_literal() {
    let script = render(&parse(
        "agent: any\nstages:\n  - name: Build\n    steps:\n      - sh: 'echo ${'\n      - sh: 'echo ${HOME} costs $5 ${'\n",
    ));
    assert!(script.contains("                sh 'echo ${'\n"), "{script}");
    assert!(
        script.contains("                sh \"echo ${HOME} costs \\$5 \\${\"\n"),
        "{script}"
    );
}

#[test]
fn test_matrix_script() {
    let pipeline = parse(
        r"
agent: none
stages:
  - name: Grid
    failFast: true
    matrix:
      agent:
        label: builder
      axes:
        - name: PLATFORM
          values: [linux, windows]
        - name: JDK
          values: ['11', '17']
      excludes:
        - - name: PLATFORM
            values: [windows]
          - name: JDK
            notValues: ['17']
      stages:
        - name: Test
          steps:
            - sh ./gradlew test
",
    );

    assert_eq!(
        render(&pipeline),
        "\
pipeline {
    agent none
    stages {
        stage('Grid') {
            failFast true
            matrix {
                agent {
                    label 'builder'
                }
                axes {
                    axis {
                        name 'PLATFORM'
                        values 'linux', 'windows'
                    }
                    axis {
                        name 'JDK'
                        values '11', '17'
                    }
                }
                excludes {
                    exclude {
                        axis {
                            name 'PLATFORM'
                            values 'windows'
                        }
                        axis {
                            name 'JDK'
                            notValues '17'
                        }
                    }
                }
                stages {
                    stage('Test') {
                        steps {
                            sh './gradlew test'
                        }
                    }
                }
            }
        }
    }
}
"
    );
}

#[test]
fn test_sequential_stages_with_two_space_indent() {
    let when = When::new(WhenCondition::any_of(vec![
        WhenCondition::branch("main"),
        WhenCondition::tag("v*"),
    ]))
    .and(WhenCondition::expression("return params.RUN\n    && env.CI\n"));
    let pipeline = Pipeline::builder()
        .agent(AgentType::docker("node:20"))
        .stage(
            Stage::sequential("CI", vec![Stage::new("Lint", vec![Step::shell("npm run lint")])])
                .with_when(when),
        )
        .build_unchecked();

    let script = ScriptGenerator::with_options(RenderOptions { indent: 2 }).render(&pipeline);
    assert_eq!(
        script,
        "\
pipeline {
  agent {
    docker 'node:20'
  }
  stages {
    stage('CI') {
      when {
        anyOf {
          branch 'main'
          tag 'v*'
        }
        expression {
          return params.RUN
              && env.CI
        }
      }
      stages {
        stage('Lint') {
          steps {
            sh 'npm run lint'
          }
        }
      }
    }
  }
}
"
    );
}

#[test]
fn test_stage_directives_and_post() {
    let stage = StageBuilder::new("Build", vec![Step::shell("make")])
        .env("MODE", "release")
        .option(Directive::new("retry").with(Argument::positional(2_i64)))
        .post(Post::new().on(PostCondition::Success, vec![Step::echo("ok")]))
        .build_unchecked();
    let pipeline = Pipeline::builder().stage(stage).build_unchecked();

    assert_eq!(
        render(&pipeline),
        "\
pipeline {
    agent any
    stages {
        stage('Build') {
            environment {
                MODE = 'release'
            }
            options {
                retry(2)
            }
            steps {
                sh 'make'
            }
            post {
                success {
                    echo 'ok'
                }
            }
        }
    }
}
"
    );
}

#[rstest]
#[case::any(AgentType::Any, "agent any\n")]
#[case::none(AgentType::None, "agent none\n")]
#[case::label(AgentType::label("arm64"), "agent {\n    label 'arm64'\n}\n")]
#[case::image(AgentType::docker("alpine:3"), "agent {\n    docker 'alpine:3'\n}\n")]
fn test_agent_forms(#[case] agent: AgentType, #[case] expected: &str) {
    let mut writer = ScriptWriter::new(4);
    ScriptGenerator::new().agent(&agent, &mut writer);
    assert_eq!(writer.finish(), expected);
}

#[test]
fn test_stage_names_are_quoted() {
    let pipeline = Pipeline::builder()
        .stage(Stage::new("Bob's build", vec![Step::echo("x")]))
        .build_unchecked();
    assert!(render(&pipeline).contains("stage('Bob\\'s build') {"));
}

#[test]
fn test_custom_registry_wrap() {
    let mut registry = DirectiveRegistry::builtin();
    registry.register(
        DirectiveSection::Options,
        DirectiveSpec::flag("lock").required(&["resource"]).wrap("lockable"),
    );
    let pipeline = Pipeline::builder()
        .option(Directive::new("lock").with(Argument::keyword("resource", "db")))
        .stage(Stage::new("A", vec![Step::echo("a")]))
        .build_with(&registry)
        .unwrap();

    let script = ScriptGenerator::new().registry(registry).render(&pipeline);
    assert!(script.contains("lock(lockable(resource: 'db'))"));
}

#[test]
fn test_custom_step_renderer() {
    fn notify(step: &Step, writer: &mut ScriptWriter, _: &StepRenderers) -> bool {
        writer.line(&format!("slackSend(message: {})", groovy::arguments(&step.args)));
        true
    }
    let mut renderers = StepRenderers::builtin();
    renderers.register("notify", notify);

    let pipeline = parse("agent: any\nstages:\n  - name: A\n    steps:\n      - notify done\n");
    let script = ScriptGenerator::new().renderers(renderers).render(&pipeline);
    assert!(script.contains("slackSend(message: 'done')"));
}

#[test]
fn test_credential_rendered_as_lookup() {
    let script = render(&parse(
        "agent: any\nenvironment:\n  TOKEN: credentials('test-credentials')\nstages:\n  - name: A\n    steps: [echo a]\n",
    ));
    assert!(script.contains("TOKEN = credentials('test-credentials')"));
}

#[test]
fn test_canonical_document_parses_to_equal_model() {
    let pipeline = parse(FULL);
    let text = to_yaml(&pipeline).unwrap();
    assert_eq!(parse(&text), pipeline);
    assert_eq!(render(&parse(&text)), FULL_SCRIPT);
}

fn stage_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _.-]{0,20}"
}

fn text() -> impl Strategy<Value = String> {
    "[ -~]{0,30}"
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        text().prop_map(Step::echo),
        text().prop_map(Step::shell),
        (1_i64..100).prop_map(|n| Step::new("sleep").with_arg(n)),
        (text(), any::<bool>()).prop_map(|(pattern, fingerprint)| {
            Step::new("archiveArtifacts")
                .with_keyword("artifacts", pattern)
                .with_keyword("fingerprint", fingerprint)
        }),
    ]
}

fn stages() -> impl Strategy<Value = Vec<Stage>> {
    prop::collection::vec((stage_name(), prop::collection::vec(step(), 1..4)), 1..6).prop_map(
        |stages| {
            stages
                .into_iter()
                .enumerate()
                .map(|(index, (name, steps))| Stage::new(format!("{name} {index}"), steps))
                .collect()
        },
    )
}

fn pipeline() -> impl Strategy<Value = Pipeline> {
    (
        stages(),
        prop::collection::vec(("[A-Z][A-Z0-9_]{0,8}", "[A-Za-z0-9 ./:-]{0,20}"), 0..4),
    )
        .prop_map(|(stages, variables)| {
            let mut environment = Environment::new();
            for (index, (name, value)) in variables.into_iter().enumerate() {
                environment = environment.set(format!("{name}_{index}"), value);
            }
            Pipeline::builder()
                .with_environment(environment)
                .stages(stages)
                .build_unchecked()
        })
}

proptest! {
    #[test]
    fn prop_stage_order_is_preserved(pipeline in pipeline()) {
        let script = render(&pipeline);
        let mut last = 0;
        for stage in &pipeline.stages {
            let header = format!("stage({}) {{", groovy::string(&stage.name));
            let position = script[last..].find(&header).map(|offset| last + offset);
            prop_assert!(position.is_some(), "missing {header}");
            last = position.unwrap_or_default() + header.len();
        }
    }

    #[test]
    fn prop_canonical_document_round_trips(pipeline in pipeline()) {
        let text = to_yaml(&pipeline).unwrap();
        match parse_and_validate(&text) {
            Ok(reparsed) => prop_assert_eq!(reparsed, pipeline),
            Err(errors) => prop_assert!(false, "{text}\n{errors:#?}"),
        }
    }

    #[test]
    fn prop_secret_never_rendered(
        id in "[a-z][a-z0-9-]{2,20}",
        secret in "SECRET-[A-Za-z0-9]{16}",
        pipeline in pipeline(),
    ) {
        let pipeline = Pipeline {
            environment: pipeline.environment.credential("API_TOKEN", id.clone()),
            ..pipeline
        };
        let script = render(&pipeline);
        prop_assert!(script.contains(&credential_lookup(&id)));
        prop_assert!(!script.contains(&secret));
    }
}
