//! yamline - declarative YAML pipelines for Jenkins
//!
//! ## Commands
//!
//! - `yamline check` - Validate a pipeline definition
//! - `yamline convert` - Render a definition as a `pipeline { }` script
//! - `yamline directives` - Print the accepted directive table
//! - `yamline completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a definition, reporting every error at once
//! yamline check ci.yaml
//!
//! # Generate the Jenkinsfile
//! yamline convert ci.yaml -o Jenkinsfile
//!
//! # Accept extra directives
//! yamline directives > directives.yaml
//! echo "directives: directives.yaml" > yamline.yaml
//! yamline --config yamline.yaml check ci.yaml
//!
//! # Generate shell completions
//! yamline completions bash > /etc/bash_completion.d/yamline
//! ```
//!
//! Set `YAMLINE_DEBUG=1` for debug logs and `YAMLINE_VERBOSE=1` for the full
//! error chain.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if std::env::var("YAMLINE_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
