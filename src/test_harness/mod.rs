//! Shared fixtures for unit and integration tests.
//!
//! Builds small throwaway repositories with fully controlled authorship
//! and timestamps, so rewrite assertions can be exact.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{BranchType, Commit, Oid, Repository, RepositoryInitOptions, Signature, Sort, Time};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

/// Deterministic RNG for timeline tests.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A throwaway repository under a temp directory.
pub struct FixtureRepo {
    dir: TempDir,
    repo: Repository,
}

impl FixtureRepo {
    /// Fresh non-bare repository with `main` as the initial branch and a
    /// fixture identity configured.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create fixture dir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("init fixture repo");
        {
            let mut config = repo.config().expect("repo config");
            config.set_str("user.name", "Fixture").expect("set user.name");
            config
                .set_str("user.email", "fixture@example.com")
                .expect("set user.email");
        }
        Self { dir, repo }
    }

    /// Bare repository, usable as a local push target.
    pub fn new_bare() -> Self {
        let dir = tempfile::tempdir().expect("create fixture dir");
        let repo = Repository::init_bare(dir.path()).expect("init bare fixture repo");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The path as a clone source locator.
    pub fn url(&self) -> String {
        self.dir.path().display().to_string()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Write `content` to `rel`, stage it, and commit with an exact
    /// author and epoch. Both author and committer get the same
    /// signature.
    pub fn commit_file(
        &self,
        rel: &str,
        content: &str,
        message: &str,
        author: (&str, &str),
        epoch: i64,
    ) -> Oid {
        let full = self.dir.path().join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&full, content).expect("write fixture file");

        let mut index = self.repo.index().expect("repo index");
        index.add_path(Path::new(rel)).expect("stage fixture file");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = self.repo.find_tree(tree_id).expect("find tree");

        let sig =
            Signature::new(author.0, author.1, &Time::new(epoch, 0)).expect("build signature");
        let head = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit<'_>> = head.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit fixture file")
    }

    /// Create a branch at the current HEAD commit.
    pub fn branch_from_head(&self, name: &str) {
        let head = self.repo.head().expect("head").peel_to_commit().expect("head commit");
        self.repo.branch(name, &head, false).expect("create branch");
    }

    /// Move HEAD to a branch and force-checkout its tree.
    pub fn checkout(&self, name: &str) {
        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .expect("set head");
        let mut builder = git2::build::CheckoutBuilder::new();
        builder.force();
        self.repo
            .checkout_head(Some(&mut builder))
            .expect("checkout head");
    }

    /// Two-parent merge commit of `other` into the current branch. The
    /// merged tree is taken from HEAD; content conflicts are out of
    /// scope for these fixtures.
    pub fn merge_into_head(
        &self,
        other: &str,
        message: &str,
        author: (&str, &str),
        epoch: i64,
    ) -> Oid {
        let head = self.repo.head().expect("head").peel_to_commit().expect("head commit");
        let other_commit = self
            .repo
            .find_branch(other, BranchType::Local)
            .expect("find branch")
            .get()
            .peel_to_commit()
            .expect("branch commit");
        let tree = head.tree().expect("head tree");
        let sig =
            Signature::new(author.0, author.1, &Time::new(epoch, 0)).expect("build signature");
        self.repo
            .commit(
                Some("HEAD"),
                &sig,
                &sig,
                message,
                &tree,
                &[&head, &other_commit],
            )
            .expect("merge commit")
    }

    pub fn branch_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in self
            .repo
            .branches(Some(BranchType::Local))
            .expect("branches")
        {
            let (branch, _) = entry.expect("branch entry");
            if let Some(name) = branch.name().expect("branch name") {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }

    pub fn head_branch(&self) -> String {
        self.repo
            .head()
            .expect("head")
            .shorthand()
            .expect("head shorthand")
            .to_string()
    }

    /// Commits reachable from local branches, newest first.
    pub fn all_commits(&self) -> Vec<Oid> {
        let mut walk = self.repo.revwalk().expect("revwalk");
        walk.set_sorting(Sort::TIME).expect("set sorting");
        walk.push_glob("refs/heads/*").expect("push glob");
        walk.map(|oid| oid.expect("walk oid")).collect()
    }

    pub fn commit_count(&self) -> usize {
        self.all_commits().len()
    }

    /// Author name, email, and authored epoch of every commit reachable
    /// from HEAD, newest first.
    pub fn head_signatures(&self) -> Vec<(String, String, i64)> {
        let mut walk = self.repo.revwalk().expect("revwalk");
        walk.set_sorting(Sort::TOPOLOGICAL).expect("set sorting");
        walk.push_head().expect("push head");
        walk.map(|oid| {
            let commit = self.repo.find_commit(oid.expect("walk oid")).expect("commit");
            let author = commit.author();
            (
                author.name().unwrap_or("").to_string(),
                author.email().unwrap_or("").to_string(),
                author.when().seconds(),
            )
        })
        .collect()
    }
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// A scratch directory whose contents tests can assert on.
pub struct ScratchRoot {
    dir: TempDir,
}

impl ScratchRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create scratch root"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Entries currently present under the root.
    pub fn entries(&self) -> Vec<PathBuf> {
        fs::read_dir(self.dir.path())
            .expect("read scratch root")
            .map(|entry| entry.expect("scratch entry").path())
            .collect()
    }
}

impl Default for ScratchRoot {
    fn default() -> Self {
        Self::new()
    }
}
