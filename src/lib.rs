//! # Yamline - declarative YAML pipelines for Jenkins
//!
//! Yamline reads a pipeline described in YAML, validates it against the
//! declarative pipeline grammar and renders an equivalent `pipeline { }`
//! script.
//!
//! ```text
//! text -> document::load -> parser::parse_and_validate -> generator::render -> script
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use yamline::prelude::*;
//!
//! let pipeline = parse_and_validate(
//!     "agent: any\nstages:\n  - name: Build\n    steps:\n      - echo hello\n",
//! )
//! .unwrap();
//! let script = render(&pipeline);
//! assert!(script.contains("stage('Build') {"));
//! assert!(script.contains("echo 'hello'"));
//! ```
//!
//! ## Features
//!
//! - **Fail-slow validation**: every error in a document is reported at once,
//!   with its path in the tree and its line and column
//! - **Deterministic output**: stages, steps and variables keep source order
//! - **Injectable directives**: the accepted `options`, `triggers`,
//!   `parameters` and `tools` live in a [`DirectiveRegistry`] table
//! - **Opaque secrets**: credentials render as `credentials('id')` lookups and
//!   are only resolved by a [`CredentialStore`](executor::CredentialStore) at
//!   run time
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <https://www.apache.org/licenses/LICENSE-2.0>)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or <https://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod document;
pub mod executor;
pub mod generator;
pub mod infrastructure;
pub mod parser;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use document::{LoadError, Node, Position, load};
pub use generator::{RenderOptions, ScriptGenerator, render};
pub use infrastructure::Config;
pub use parser::{ParserConfig, parse_and_validate, parse_and_validate_with};
pub use pipeline::{
    AgentType, DirectiveRegistry, Environment, Pipeline, PipelineBuilder, PipelineError, Stage,
    StageBuilder, Step, ValidationError, WhenCondition,
};

/// Version of the yamline crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
