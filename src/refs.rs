//! Branch and remote management.
//!
//! Local branch renames and `origin` remote configuration on an owned
//! working copy, plus a read-only snapshot of the ref and history state
//! for inspection front ends.

use git2::{BranchType, Repository};
use serde::Serialize;
use thiserror::Error;

use crate::rewrite;
use crate::timeline::format_epoch;

#[derive(Error, Debug)]
pub enum RefError {
    #[error("branch {0:?} does not exist")]
    NotFound(String),

    #[error("branch {0:?} already exists")]
    AlreadyExists(String),

    #[error("ref operation failed: {0}")]
    Git(#[from] git2::Error),
}

/// Rename a local branch. HEAD follows when it pointed at the old name
/// (libgit2 renames the ref but leaves a symbolic HEAD dangling on its
/// own). Renaming a branch to its own name is a no-op.
pub fn rename_branch(repo: &Repository, old: &str, new: &str) -> Result<(), RefError> {
    if old == new {
        return Ok(());
    }
    let mut branch = repo
        .find_branch(old, BranchType::Local)
        .map_err(|_| RefError::NotFound(old.to_string()))?;
    if repo.find_branch(new, BranchType::Local).is_ok() {
        return Err(RefError::AlreadyExists(new.to_string()));
    }

    let old_ref = format!("refs/heads/{old}");
    let head_on_old = repo
        .find_reference("HEAD")
        .ok()
        .and_then(|head| head.symbolic_target().map(str::to_string))
        .is_some_and(|target| target == old_ref);

    branch.rename(new, false)?;
    if head_on_old {
        repo.set_head(&format!("refs/heads/{new}"))?;
    }
    tracing::debug!(old, new, "renamed branch");
    Ok(())
}

/// Point the `origin` remote at `url`, creating it when absent.
///
/// When the remote exists its URL is replaced in place; nothing else
/// about its configuration is touched.
pub fn configure_origin(repo: &Repository, url: &str) -> Result<(), RefError> {
    match repo.find_remote("origin") {
        Ok(_) => {
            tracing::warn!(url, "origin already configured, replacing its url");
            repo.remote_set_url("origin", url)?;
        }
        Err(_) => {
            repo.remote("origin", url)?;
        }
    }
    Ok(())
}

/// Names of all local branches, sorted.
pub fn local_branches(repo: &Repository) -> Result<Vec<String>, RefError> {
    let mut names = Vec::new();
    for entry in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = entry?;
        if let Some(name) = branch.name()? {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

// ============================================================================
// Inspection snapshot
// ============================================================================

/// One commit as shown by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRecord {
    pub id: String,
    pub author: String,
    pub email: String,
    /// Authored time, RFC 3339 UTC.
    pub date: String,
    pub summary: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteRecord {
    pub name: String,
    pub url: String,
}

/// Read-only snapshot of a repository's refs and reachable history.
#[derive(Debug, Clone, Serialize)]
pub struct RepoInfo {
    pub branches: Vec<String>,
    pub remotes: Vec<RemoteRecord>,
    /// Newest first, same order the rewrite enumerates.
    pub commits: Vec<CommitRecord>,
}

pub fn snapshot(repo: &Repository) -> Result<RepoInfo, RefError> {
    let branches = local_branches(repo)?;

    let mut remotes = Vec::new();
    for name in repo.remotes()?.iter().flatten() {
        let remote = repo.find_remote(name)?;
        remotes.push(RemoteRecord {
            name: name.to_string(),
            url: remote.url().unwrap_or("").to_string(),
        });
    }

    let mut commits = Vec::new();
    for oid in rewrite::enumerate_commits(repo).map_err(|err| match err {
        rewrite::RewriteError::Git(git) => RefError::Git(git),
        other => RefError::Git(git2::Error::from_str(&other.to_string())),
    })? {
        let commit = repo.find_commit(oid)?;
        let author = commit.author();
        commits.push(CommitRecord {
            id: oid.to_string(),
            author: author.name().unwrap_or("unknown").to_string(),
            email: author.email().unwrap_or("unknown").to_string(),
            date: format_epoch(author.when().seconds()),
            summary: commit.summary().unwrap_or("").to_string(),
            parents: commit.parent_ids().map(|id| id.to_string()).collect(),
        });
    }

    Ok(RepoInfo {
        branches,
        remotes,
        commits,
    })
}
