//! Ephemeral working copies.
//!
//! Each work item gets a freshly cloned, exclusively owned checkout under
//! a temp directory. The guard removes the directory when dropped, on
//! every exit path, so a failed pipeline never leaves checkouts behind.

use std::io;
use std::path::Path;

use git2::Repository;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("failed to create working directory: {0}")]
    Workdir(#[from] io::Error),

    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },
}

/// An exclusively owned checkout of one repository.
pub struct WorkingCopy {
    url: String,
    // Declared before `dir` so the repository handle is dropped first.
    repo: Repository,
    dir: TempDir,
}

impl WorkingCopy {
    /// Clone `url` into a fresh temp directory under the system temp root.
    pub fn acquire(url: &str) -> Result<Self, AcquireError> {
        let dir = TempDir::with_prefix("reweave-")?;
        Self::clone_into(url, dir)
    }

    /// Clone `url` into a fresh temp directory under `root`. Lets callers
    /// (and tests) confine all scratch space to one directory.
    pub fn acquire_in(url: &str, root: &Path) -> Result<Self, AcquireError> {
        let dir = TempDir::with_prefix_in("reweave-", root)?;
        Self::clone_into(url, dir)
    }

    fn clone_into(url: &str, dir: TempDir) -> Result<Self, AcquireError> {
        tracing::debug!(url, dest = %dir.path().display(), "cloning working copy");
        let repo = Repository::clone(url, dir.path()).map_err(|source| AcquireError::Clone {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            url: url.to_string(),
            repo,
            dir,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }
}
