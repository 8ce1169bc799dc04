//! CLI tools for yamline
//!
//! - `check`: Validate a pipeline definition and report every error
//! - `convert`: Render a definition as a `pipeline { }` script
//! - `directives`: Print the accepted directive table
//! - `completions`: Generate shell completions

pub mod check;
pub mod completions;
pub mod directives;
pub mod export;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use yamline::generator::ScriptGenerator;
use yamline::infrastructure::{Config, init_logging};

/// CLI arguments for yamline
#[derive(Parser, Debug)]
#[command(name = "yamline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a pipeline definition
    Check {
        /// Pipeline definition to validate
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Convert a pipeline definition to a script
    Convert {
        /// Pipeline definition to convert
        file: PathBuf,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output form
        #[arg(short, long, value_enum, default_value_t = TargetArg::Groovy)]
        to: TargetArg,
    },

    /// Print the accepted directives
    Directives {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = TableFormat::Yaml)]
        format: TableFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TargetArg {
    Groovy,
    Yaml,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TableFormat {
    Yaml,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => Config::default(),
    };
    init_logging(args.log_level.as_deref().unwrap_or(&config.log_level));
    let parser_config = config
        .parser_config()
        .context("Failed to load directive definitions")?;

    match args.command {
        Command::Check { file, format } => {
            let report = check::check_pipeline(&file, &parser_config)?;
            let format = match format {
                ReportFormat::Text => check::OutputFormat::Text,
                ReportFormat::Json => check::OutputFormat::Json,
            };
            println!("{}", check::format_report(&report, format)?);
            if !report.valid {
                anyhow::bail!(
                    "{} has {} error(s)",
                    file.display(),
                    report.errors.len()
                );
            }
        }
        Command::Convert { file, output, to } => {
            let target = match to {
                TargetArg::Groovy => export::Target::Script,
                TargetArg::Yaml => export::Target::Document,
            };
            let generator = ScriptGenerator::with_options(config.render_options())
                .registry(parser_config.registry.clone());
            let converted = export::convert_pipeline(&file, &parser_config, &generator, target)?;

            if let Some(output_path) = output {
                export::save_export(&converted, &output_path)?;
            } else {
                print!("{converted}");
            }
        }
        Command::Directives { format } => {
            let format = match format {
                TableFormat::Yaml => directives::TableFormat::Yaml,
                TableFormat::Json => directives::TableFormat::Json,
            };
            println!("{}", directives::list_directives(&parser_config.registry, format)?);
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
                ShellArg::Elvish => Shell::Elvish,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_arguments() {
        let args = Args::try_parse_from([
            "yamline",
            "convert",
            "ci.yaml",
            "-o",
            "Jenkinsfile",
            "--config",
            "yamline.yaml",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("yamline.yaml")));
        match args.command {
            Command::Convert { file, output, to } => {
                assert_eq!(file, PathBuf::from("ci.yaml"));
                assert_eq!(output, Some(PathBuf::from("Jenkinsfile")));
                assert_eq!(to, TargetArg::Groovy);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_format() {
        let args = Args::try_parse_from(["yamline", "check", "ci.yaml", "--format", "json"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Check {
                format: ReportFormat::Json,
                ..
            }
        ));
    }
}
