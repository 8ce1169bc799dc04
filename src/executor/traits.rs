//! Collaborator interfaces
//!
//! The core never fetches, resolves or runs anything itself. These traits
//! describe the collaborators a caller composes it with: where definitions
//! come from, where secrets live and what executes the generated script.

use crate::pipeline::{BuildResult, CredentialId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A repository a pipeline definition is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryLocation {
    /// Repository URL or local identifier
    pub url: String,
}

impl RepositoryLocation {
    /// Creates a location
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Errors raised by an [`ScmProvider`]
#[derive(Error, Debug)]
pub enum ScmError {
    /// The file does not exist on the branch
    #[error("'{path}' not found on branch '{branch}' of {repository}")]
    NotFound {
        /// Repository searched
        repository: String,
        /// Branch searched
        branch: String,
        /// Requested path
        path: String,
    },

    /// The requested path leaves the repository
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// The repository could not be reached
    #[error("repository {repository} unavailable: {reason}")]
    Unavailable {
        /// Repository
        repository: String,
        /// Cause
        reason: String,
    },

    /// I/O failure while reading
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supplies raw file bytes by repository, branch and path
#[allow(clippy::missing_errors_doc)]
pub trait ScmProvider: Send + Sync {
    /// Returns the bytes of `path` on `branch`
    fn fetch(
        &self,
        repository: &RepositoryLocation,
        branch: &str,
        path: &str,
    ) -> Result<Vec<u8>, ScmError>;
}

/// Secret material, only ever produced at execution time
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps secret material
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Resolves credential identifiers to secrets
pub trait CredentialStore: Send + Sync {
    /// Looks up a secret, `None` if the identifier is unknown
    fn resolve(&self, id: &CredentialId) -> Option<Secret>;
}

/// Credential store backed by a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    secrets: HashMap<CredentialId, Secret>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.insert(id, secret);
        self
    }

    /// Adds or replaces a secret
    pub fn insert(&mut self, id: impl Into<String>, secret: impl Into<String>) {
        self.secrets
            .insert(CredentialId::new(id), Secret::new(secret));
    }

    /// Number of stored secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Returns true if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn resolve(&self, id: &CredentialId) -> Option<Secret> {
        self.secrets.get(id).cloned()
    }
}

/// What a runner needs besides the script
#[derive(Clone)]
pub struct ExecutionContext {
    /// Working directory for the build
    pub working_dir: PathBuf,

    /// Extra environment variables
    pub env: BTreeMap<String, String>,

    /// Resolver for `credentials('id')` lookups
    pub credentials: Arc<dyn CredentialStore>,
}

impl ExecutionContext {
    /// Creates a context with no variables and an empty credential store
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            credentials: Arc::new(InMemoryCredentialStore::new()),
        }
    }

    /// Sets an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the credential resolver
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Result of running a script
pub struct RunOutcome {
    /// Coarse build result
    pub result: BuildResult,

    /// Build log lines
    pub log: BoxStream<'static, String>,
}

impl fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOutcome")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// Errors raised by a [`ScriptRunner`]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The runner refused the script
    #[error("script rejected: {0}")]
    Rejected(String),

    /// A referenced credential is not in the store
    #[error("unknown credential '{0}'")]
    UnknownCredential(CredentialId),

    /// The runner is not reachable
    #[error("runner unavailable: {0}")]
    Unavailable(String),
}

/// Executes generated scripts
#[async_trait]
#[allow(clippy::missing_errors_doc)]
pub trait ScriptRunner: Send + Sync {
    /// Runs the script and reports its outcome
    async fn run(&self, script: &str, context: &ExecutionContext) -> Result<RunOutcome, RunnerError>;
}

#[async_trait]
impl<T: ScriptRunner + ?Sized> ScriptRunner for Arc<T> {
    async fn run(&self, script: &str, context: &ExecutionContext) -> Result<RunOutcome, RunnerError> {
        (**self).run(script, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(secret.to_string(), "****");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryCredentialStore::new().with("deploy-key", "s3cr3t");
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.resolve(&CredentialId::new("deploy-key")),
            Some(Secret::new("s3cr3t"))
        );
        assert_eq!(store.resolve(&CredentialId::new("other")), None);
    }

    #[test]
    fn test_context_debug_hides_credentials() {
        let store = InMemoryCredentialStore::new().with("id", "s3cr3t");
        let context = ExecutionContext::new("/work")
            .with_env("CI", "true")
            .with_credentials(Arc::new(store));
        let debug = format!("{context:?}");
        assert!(debug.contains("CI"));
        assert!(!debug.contains("s3cr3t"));
    }
}
