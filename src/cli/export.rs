//! `yamline convert` - Render pipeline definitions
//!
//! Produces the `pipeline { }` script, or the canonical YAML form of the
//! definition. Nothing is written unless the whole definition is valid.

use super::check::format_errors;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use yamline::generator::{ScriptGenerator, to_yaml};
use yamline::parser::{ParserConfig, parse_and_validate_with};

/// What to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Declarative `pipeline { }` script
    Script,
    /// Normalized YAML definition
    Document,
}

pub fn convert_pipeline(
    file: &Path,
    config: &ParserConfig,
    generator: &ScriptGenerator,
    target: Target,
) -> Result<String> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let pipeline = match parse_and_validate_with(&content, config) {
        Ok(pipeline) => pipeline,
        Err(errors) => {
            anyhow::bail!(
                "{} is not a valid pipeline ({} error(s)):\n{}",
                file.display(),
                errors.len(),
                format_errors(&file.display().to_string(), &errors).trim_end()
            );
        }
    };

    match target {
        Target::Script => Ok(generator.render(&pipeline)),
        Target::Document => to_yaml(&pipeline).context("Failed to serialize pipeline"),
    }
}

pub fn save_export(content: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write output to: {}", output_path.display()))?;
    tracing::info!(output = %output_path.display(), "Wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yamline::generator::RenderOptions;

    const DEFINITION: &str = "\
agent: any
environment:
  TOKEN:
    credentials: deploy-token
stages:
  - name: Build
    steps:
      - sh: make
  - name: Test
    steps:
      - sh make test
";

    #[test]
    fn test_convert_to_script_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ci.yaml");
        let output = dir.path().join("Jenkinsfile");
        fs::write(&input, DEFINITION).unwrap();

        let script = convert_pipeline(
            &input,
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            Target::Script,
        )
        .unwrap();
        save_export(&script, &output).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("pipeline {\n"));
        assert!(written.contains("TOKEN = credentials('deploy-token')"));
        let build = written.find("stage('Build')").unwrap();
        let test = written.find("stage('Test')").unwrap();
        assert!(build < test);
    }

    #[test]
    fn test_convert_respects_indent() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ci.yaml");
        fs::write(&input, DEFINITION).unwrap();

        let generator = ScriptGenerator::with_options(RenderOptions { indent: 2 });
        let script =
            convert_pipeline(&input, &ParserConfig::default(), &generator, Target::Script)
                .unwrap();
        assert!(script.contains("\n  agent any\n"));
    }

    #[test]
    fn test_convert_to_document() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ci.yaml");
        fs::write(&input, DEFINITION).unwrap();

        let document = convert_pipeline(
            &input,
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            Target::Document,
        )
        .unwrap();
        assert!(document.contains("- sh: make test"));
        assert!(document.contains("credentials: deploy-token"));
    }

    #[test]
    fn test_invalid_pipeline_is_not_converted() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ci.yaml");
        fs::write(
            &input,
            "agent: any\nstages:\n  - name: A\n    steps: [echo a]\n  - name: A\n    steps: [echo b]\n",
        )
        .unwrap();

        let err = convert_pipeline(
            &input,
            &ParserConfig::default(),
            &ScriptGenerator::new(),
            Target::Script,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 error(s)"));
        assert!(message.contains("duplicate stage name 'A'"));
    }
}
