//! Full-history metadata rewrite.
//!
//! Re-creates every commit reachable from any local branch with a
//! substituted identity and/or assigned timestamps, then moves each
//! branch ref to the rewritten counterpart of its old target. All
//! structured git2 calls; no external rewrite tool, no generated scripts,
//! no scratch files.
//!
//! Ordering contract: timestamp lists pair with the newest-first
//! enumeration from [`enumerate_commits`], the same order the timeline
//! generator emits. The lookup itself is keyed by full commit id, so
//! short-prefix collisions cannot arise.

use std::collections::HashMap;

use git2::{BranchType, Commit, Oid, Repository, Signature, Sort, Time};
use thiserror::Error;

use crate::config::Identity;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("timestamp count mismatch: {commits} commits but {timestamps} timestamps")]
    CountMismatch { commits: usize, timestamps: usize },

    #[error("parent {0} was not rewritten before its child")]
    ParentNotRewritten(Oid),

    #[error("history rewrite failed: {0}")]
    Git(#[from] git2::Error),
}

/// What a completed rewrite touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub commits: usize,
    pub refs_updated: usize,
}

/// All commits reachable from local branches, newest first (`Sort::TIME`).
///
/// This is the stable enumeration order used to pair commits with
/// generated timestamps.
pub fn enumerate_commits(repo: &Repository) -> Result<Vec<Oid>, RewriteError> {
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push_glob("refs/heads/*")?;
    let oids = walk.collect::<Result<Vec<_>, _>>()?;
    Ok(oids)
}

pub fn count_commits(repo: &Repository) -> Result<usize, RewriteError> {
    enumerate_commits(repo).map(|oids| oids.len())
}

/// Rewrite every commit reachable from every local branch.
///
/// `identity`, when given, replaces both author and committer.
/// `timestamps`, when given, must hold exactly one entry per reachable
/// commit in newest-first order; each replaces both the authored and
/// committed time. Validation happens before any object is written
/// (`CountMismatch` leaves the repository untouched), and branch refs
/// only move after every replacement commit exists, so a mid-walk
/// failure leaves the original refs intact.
pub fn rewrite_history(
    repo: &Repository,
    identity: Option<&Identity>,
    timestamps: Option<&[i64]>,
) -> Result<RewriteOutcome, RewriteError> {
    // Validate before mutate: build the full-id timestamp assignment up
    // front, or refuse.
    let assignment: Option<HashMap<Oid, i64>> = match timestamps {
        Some(stamps) => {
            let commits = enumerate_commits(repo)?;
            if commits.len() != stamps.len() {
                return Err(RewriteError::CountMismatch {
                    commits: commits.len(),
                    timestamps: stamps.len(),
                });
            }
            Some(commits.into_iter().zip(stamps.iter().copied()).collect())
        }
        None => None,
    };

    // Parents before children, so every rewritten commit can point at the
    // rewritten counterparts of its parents.
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
    walk.push_glob("refs/heads/*")?;

    let mut replacements: HashMap<Oid, Oid> = HashMap::new();
    let mut new_times: HashMap<Oid, i64> = HashMap::new();
    let mut commits = 0_usize;

    for oid in walk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;

        let new_parent_oids = commit
            .parent_ids()
            .map(|parent| {
                replacements
                    .get(&parent)
                    .copied()
                    .ok_or(RewriteError::ParentNotRewritten(parent))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Clamp against rewritten parents so an ancestor never ends up
        // newer than a descendant, even across merge branches.
        let assigned = assignment.as_ref().map(|map| {
            let drawn = map.get(&oid).copied().unwrap_or_else(|| {
                // Unreachable when the assignment covers the same walk;
                // fall back to the original time rather than panic.
                commit.time().seconds()
            });
            let parent_floor = commit
                .parent_ids()
                .filter_map(|parent| new_times.get(&parent).copied())
                .max();
            match parent_floor {
                Some(floor) => drawn.max(floor),
                None => drawn,
            }
        });

        let new_oid = recreate_commit(repo, &commit, &new_parent_oids, identity, assigned)?;
        replacements.insert(oid, new_oid);
        if let Some(t) = assigned {
            new_times.insert(oid, t);
        }
        commits += 1;
    }

    let refs_updated = retarget_branches(repo, &replacements)?;
    tracing::debug!(commits, refs_updated, "history rewrite complete");
    Ok(RewriteOutcome {
        commits,
        refs_updated,
    })
}

/// Write one replacement commit: same tree and message, substituted
/// signatures, remapped parents. Dangling until the refs move.
fn recreate_commit(
    repo: &Repository,
    original: &Commit<'_>,
    parent_oids: &[Oid],
    identity: Option<&Identity>,
    assigned_time: Option<i64>,
) -> Result<Oid, RewriteError> {
    let parents = parent_oids
        .iter()
        .map(|oid| repo.find_commit(*oid))
        .collect::<Result<Vec<_>, _>>()?;
    let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

    let author = substitute(&original.author(), identity, assigned_time)?;
    let committer = substitute(&original.committer(), identity, assigned_time)?;
    let tree = original.tree()?;
    let message = original.message_raw().unwrap_or("");

    let oid = repo.commit(None, &author, &committer, message, &tree, &parent_refs)?;
    Ok(oid)
}

fn substitute(
    original: &Signature<'_>,
    identity: Option<&Identity>,
    assigned_time: Option<i64>,
) -> Result<Signature<'static>, RewriteError> {
    let when = match assigned_time {
        // Assigned times are UTC; the original offset is discarded.
        Some(secs) => Time::new(secs, 0),
        None => original.when(),
    };
    let (name, email) = match identity {
        Some(id) => (id.name.as_str(), id.email.as_str()),
        None => (
            original.name().unwrap_or("unknown"),
            original.email().unwrap_or("unknown"),
        ),
    };
    let sig = Signature::new(name, email, &when)?;
    Ok(sig)
}

/// Point every local branch at the rewritten counterpart of its target.
fn retarget_branches(
    repo: &Repository,
    replacements: &HashMap<Oid, Oid>,
) -> Result<usize, RewriteError> {
    // Collect first; creating references while iterating branches would
    // mutate the ref store under the iterator.
    let mut branches: Vec<(String, Oid)> = Vec::new();
    for entry in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = entry?;
        let reference = branch.get();
        if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
            branches.push((name.to_string(), target));
        }
    }

    let mut updated = 0;
    for (name, target) in branches {
        if let Some(new_target) = replacements.get(&target) {
            if *new_target != target {
                repo.reference(&name, *new_target, true, "history rewrite")?;
                updated += 1;
            }
        }
    }
    Ok(updated)
}
