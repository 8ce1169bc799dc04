//! `yamline check` - Validate a pipeline definition
//!
//! Every problem in the file is reported in one pass, each with its location
//! in the document tree and in the text.
//!
//! ## Usage
//!
//! ```bash
//! yamline check <pipeline.yaml> [--format text|json]
//! # Exit code 0: valid
//! # Exit code 1: validation errors found
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use yamline::parser::{ParserConfig, parse_and_validate_with};
use yamline::pipeline::ValidationError;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Result of checking one file
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub file: String,
    pub valid: bool,
    pub stages: usize,
    pub errors: Vec<ValidationError>,
}

/// Reads and validates a pipeline definition.
///
/// Only I/O problems are returned as `Err`; validation errors are part of
/// the report.
pub fn check_pipeline(file: &Path, config: &ParserConfig) -> Result<CheckReport> {
    tracing::debug!(file = %file.display(), "Validating pipeline");

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let file = file.display().to_string();
    let report = match parse_and_validate_with(&content, config) {
        Ok(pipeline) => CheckReport {
            file,
            valid: true,
            stages: pipeline.stage_count(),
            errors: Vec::new(),
        },
        Err(errors) => CheckReport {
            file,
            valid: false,
            stages: 0,
            errors,
        },
    };

    tracing::info!(
        file = %report.file,
        valid = report.valid,
        errors = report.errors.len(),
        "Validation finished"
    );
    Ok(report)
}

/// One line per error: `file:line:column: path: message`
pub fn format_errors(file: &str, errors: &[ValidationError]) -> String {
    let mut output = String::new();
    for error in errors {
        let location = match error.position {
            Some(position) => format!("{file}:{}:{}", position.line, position.column),
            None => file.to_string(),
        };
        let _ = writeln!(output, "{location}: {}: {}", error.path, error.message());
    }
    output
}

pub fn format_report(report: &CheckReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report")
        }
        OutputFormat::Text if report.valid => Ok(format!(
            "{}: OK ({} top-level stage(s))",
            report.file, report.stages
        )),
        OutputFormat::Text => Ok(format_errors(&report.file, &report.errors)
            .trim_end()
            .to_string()),
    }
}
