//! Directory-backed SCM provider

use super::traits::{RepositoryLocation, ScmError, ScmProvider};
use std::path::{Component, Path, PathBuf};

/// Serves pipeline definitions from a checked-out directory.
///
/// The working tree already is one branch, so the requested branch is only
/// used for error messages.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    /// Creates a workspace rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins a relative path onto the root, refusing anything that escapes it
    fn resolve(&self, path: &str) -> Result<PathBuf, ScmError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(ScmError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ScmProvider for LocalWorkspace {
    fn fetch(
        &self,
        repository: &RepositoryLocation,
        branch: &str,
        path: &str,
    ) -> Result<Vec<u8>, ScmError> {
        let file = self.resolve(path)?;
        tracing::debug!(%repository, branch, file = %file.display(), "Reading pipeline definition");
        match std::fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ScmError::NotFound {
                repository: repository.to_string(),
                branch: branch.to_string(),
                path: path.to_string(),
            }),
            Err(err) => Err(ScmError::Io(err)),
        }
    }
}
