//! Caller-side composition of the core with its collaborators
//!
//! fetch -> parse & validate -> render -> run. Each step either hands a
//! clean artifact to the next or stops with a [`PipelineError`].

use super::traits::{ExecutionContext, RepositoryLocation, RunOutcome, ScmProvider, ScriptRunner};
use crate::generator::ScriptGenerator;
use crate::parser::{ParserConfig, parse_and_validate_with};
use crate::pipeline::PipelineError;

/// Where a pipeline definition lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSource {
    /// Repository holding the definition
    pub repository: RepositoryLocation,
    /// Branch to read
    pub branch: String,
    /// Path of the definition inside the repository
    pub path: String,
}

impl PipelineSource {
    /// Creates a source
    #[must_use]
    pub fn new(
        repository: RepositoryLocation,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            branch: branch.into(),
            path: path.into(),
        }
    }
}

/// Fetches a definition, validates it and renders the script.
///
/// # Errors
///
/// Returns [`PipelineError::Scm`] if the file cannot be fetched,
/// [`PipelineError::Encoding`] for non UTF-8 content and
/// [`PipelineError::Invalid`] with every validation error otherwise.
pub fn fetch_and_render(
    scm: &dyn ScmProvider,
    source: &PipelineSource,
    config: &ParserConfig,
    generator: &ScriptGenerator,
) -> Result<String, PipelineError> {
    let bytes = scm.fetch(&source.repository, &source.branch, &source.path)?;
    let text = String::from_utf8(bytes).map_err(|_| PipelineError::Encoding {
        path: source.path.clone(),
    })?;

    let pipeline = parse_and_validate_with(&text, config)?;
    tracing::info!(
        path = %source.path,
        branch = %source.branch,
        stages = pipeline.stage_count(),
        "Pipeline definition accepted"
    );
    Ok(generator.render(&pipeline))
}

/// Fetches, validates and renders a definition, then hands the script to a runner.
///
/// Nothing reaches the runner unless the whole definition is valid.
///
/// # Errors
///
/// Everything [`fetch_and_render`] returns, plus [`PipelineError::Runner`].
pub async fn fetch_render_run(
    scm: &dyn ScmProvider,
    source: &PipelineSource,
    config: &ParserConfig,
    generator: &ScriptGenerator,
    runner: &dyn ScriptRunner,
    context: &ExecutionContext,
) -> Result<RunOutcome, PipelineError> {
    let script = fetch_and_render(scm, source, config, generator)?;
    let outcome = runner.run(&script, context).await?;
    tracing::info!(path = %source.path, result = %outcome.result, "Run finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::traits::{InMemoryCredentialStore, RunnerError, ScmError, Secret};
    use crate::pipeline::{BuildResult, CredentialId};
    use async_trait::async_trait;
    use futures::StreamExt;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const DEFINITION: &str = "\
agent: any
environment:
  TOKEN:
    credentials: test-credentials
stages:
  - name: Build
    steps:
      - echo hello
";

    struct FakeScm {
        files: HashMap<(String, String), Vec<u8>>,
    }

    impl FakeScm {
        fn with(branch: &str, path: &str, content: impl Into<Vec<u8>>) -> Self {
            let mut files = HashMap::new();
            files.insert((branch.to_string(), path.to_string()), content.into());
            Self { files }
        }
    }

    impl ScmProvider for FakeScm {
        fn fetch(
            &self,
            repository: &RepositoryLocation,
            branch: &str,
            path: &str,
        ) -> Result<Vec<u8>, ScmError> {
            self.files
                .get(&(branch.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| ScmError::NotFound {
                    repository: repository.to_string(),
                    branch: branch.to_string(),
                    path: path.to_string(),
                })
        }
    }

    static LOOKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"credentials\('([^']+)'\)").unwrap());

    /// Resolves credential lookups at run time and echoes masked lines
    #[derive(Default)]
    struct RecordingRunner {
        scripts: Mutex<Vec<String>>,
        resolved: Mutex<Vec<Secret>>,
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(
            &self,
            script: &str,
            context: &ExecutionContext,
        ) -> Result<RunOutcome, RunnerError> {
            for captures in LOOKUP.captures_iter(script) {
                let id = CredentialId::new(&captures[1]);
                let secret = context
                    .credentials
                    .resolve(&id)
                    .ok_or(RunnerError::UnknownCredential(id))?;
                self.resolved.lock().unwrap().push(secret);
            }
            self.scripts.lock().unwrap().push(script.to_string());

            let log: Vec<String> = script.lines().map(str::to_string).collect();
            Ok(RunOutcome {
                result: BuildResult::Success,
                log: futures::stream::iter(log).boxed(),
            })
        }
    }

    fn source() -> PipelineSource {
        PipelineSource::new(RepositoryLocation::new("git@example.com:app"), "main", "ci.yaml")
    }

    #[test]
    fn test_fetch_and_render() {
        let scm = FakeScm::with("main", "ci.yaml", DEFINITION);
        let script = fetch_and_render(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
        )
        .unwrap();
        assert!(script.contains("stage('Build')"));
        assert!(script.contains("TOKEN = credentials('test-credentials')"));
    }

    #[test]
    fn test_scm_errors_propagate() {
        let scm = FakeScm::with("develop", "ci.yaml", DEFINITION);
        let err = fetch_and_render(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Scm(ScmError::NotFound { .. })));
    }

    #[test]
    fn test_non_utf8_definition() {
        let scm = FakeScm::with("main", "ci.yaml", vec![0xff, 0xfe, 0x00]);
        let err = fetch_and_render(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Encoding { ref path } if path == "ci.yaml"));
    }

    #[tokio::test]
    async fn test_invalid_definition_never_reaches_runner() {
        let scm = FakeScm::with("main", "ci.yaml", "agent: any\nstages: []\nbogus: 1\n");
        let runner = RecordingRunner::default();
        let context = ExecutionContext::new("/work");

        let err = fetch_render_run(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            &runner,
            &context,
        )
        .await
        .unwrap_err();

        let PipelineError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert!(runner.scripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_secrets_resolve_only_at_run_time() {
        let scm = FakeScm::with("main", "ci.yaml", DEFINITION);
        let runner = RecordingRunner::default();
        let store = InMemoryCredentialStore::new().with("test-credentials", "s3cr3t-value");
        let context = ExecutionContext::new("/work").with_credentials(Arc::new(store));

        let outcome = fetch_render_run(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            &runner,
            &context,
        )
        .await
        .unwrap();

        assert_eq!(outcome.result, BuildResult::Success);
        let log: Vec<String> = outcome.log.collect().await;
        assert!(log.iter().any(|line| line.contains("echo 'hello'")));
        assert!(log.iter().all(|line| !line.contains("s3cr3t-value")));

        let scripts = runner.scripts.lock().unwrap();
        assert!(!scripts[0].contains("s3cr3t-value"));
        assert_eq!(
            runner.resolved.lock().unwrap().as_slice(),
            &[Secret::new("s3cr3t-value")]
        );
    }

    #[tokio::test]
    async fn test_unknown_credential_is_a_runner_error() {
        let scm = FakeScm::with("main", "ci.yaml", DEFINITION);
        let runner = RecordingRunner::default();
        let context = ExecutionContext::new("/work");

        let err = fetch_render_run(
            &scm,
            &source(),
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            &runner,
            &context,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Runner(RunnerError::UnknownCredential(_))
        ));
    }
}
