//! Collaborator boundary
//!
//! Traits for the systems the core is composed with, a directory-backed
//! SCM provider and the caller-side composition helpers.

pub mod compose;
mod traits;
mod workspace;

pub use compose::{PipelineSource, fetch_and_render, fetch_render_run};
pub use traits::{
    CredentialStore, ExecutionContext, InMemoryCredentialStore, RepositoryLocation, RunOutcome,
    RunnerError, ScmError, ScmProvider, ScriptRunner, Secret,
};
pub use workspace::LocalWorkspace;
