//! Content scrubbing.
//!
//! Walks the working tree (never `.git`), replaces every match of every
//! pattern in text-decodable files, and commits the change set as one
//! commit when anything was modified. Files that are not valid UTF-8 are
//! treated as binary and left byte-identical. A separate read-only scan
//! flags file *names* that suggest sensitive content, for operator review.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, Signature};
use thiserror::Error;

use crate::config::{Identity, ScrubSpec};

/// Message of the commit that captures a scrub change set.
pub const SCRUB_COMMIT_MESSAGE: &str = "Clean sensitive data";

/// Name fragments that mark a file for operator review.
pub const SENSITIVE_NAME_MARKERS: &[&str] = &[
    "license",
    "copyright",
    "author",
    "contributor",
    "readme",
    "changelog",
    "maintainers",
    "codeowners",
    "governance",
    "conduct",
];

#[derive(Error, Debug)]
pub enum ScrubError {
    #[error("repository has no working tree")]
    BareRepository,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to commit scrubbed files: {0}")]
    Git(#[from] git2::Error),
}

/// Replace pattern matches across every text file under `root`.
/// Returns how many files were modified.
pub fn scrub_tree(root: &Path, spec: &ScrubSpec) -> Result<usize, ScrubError> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut modified = 0;
    for path in files {
        if scrub_file(&path, spec)? {
            tracing::debug!(path = %path.display(), "scrubbed file");
            modified += 1;
        }
    }
    Ok(modified)
}

/// Scrub a single file. Returns true when its contents changed.
pub fn scrub_file(path: &Path, spec: &ScrubSpec) -> Result<bool, ScrubError> {
    let bytes = fs::read(path).map_err(|source| ScrubError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        // Not text: binary files stay byte-identical.
        Err(_) => return Ok(false),
    };

    let mut scrubbed = text.clone();
    for pattern in &spec.patterns {
        if let std::borrow::Cow::Owned(next) =
            pattern.replace_all(&scrubbed, spec.replacement.as_str())
        {
            scrubbed = next;
        }
    }

    // Compare against the original to keep the idempotence guarantee:
    // a second pass with the same patterns rewrites nothing.
    if scrubbed == text {
        return Ok(false);
    }
    fs::write(path, scrubbed).map_err(|source| ScrubError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Scrub the repository working tree and, when anything changed, stage
/// everything and commit with [`SCRUB_COMMIT_MESSAGE`]. The scrub commit
/// carries `identity` when given so the appended history matches the
/// rewritten one. Returns the modified-file count; zero means no commit.
pub fn scrub_and_commit(
    repo: &Repository,
    spec: &ScrubSpec,
    identity: Option<&Identity>,
) -> Result<usize, ScrubError> {
    let root = repo.workdir().ok_or(ScrubError::BareRepository)?;
    let modified = scrub_tree(root, spec)?;
    if modified == 0 {
        tracing::debug!("no files needed scrubbing");
        return Ok(0);
    }

    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let sig = match identity {
        Some(id) => Signature::now(&id.name, &id.email)?,
        None => repo
            .signature()
            .or_else(|_| Signature::now("reweave", "reweave@localhost"))?,
    };
    let head = repo.head()?.peel_to_commit()?;
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        SCRUB_COMMIT_MESSAGE,
        &tree,
        &[&head],
    )?;
    tracing::info!(modified, "committed scrub change set");
    Ok(modified)
}

/// Read-only scan: files whose *name* matches the sensitivity vocabulary.
pub fn find_sensitive_files(root: &Path) -> Result<Vec<PathBuf>, ScrubError> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut flagged: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| {
                    let lower = name.to_string_lossy().to_lowercase();
                    SENSITIVE_NAME_MARKERS
                        .iter()
                        .any(|marker| lower.contains(marker))
                })
                .unwrap_or(false)
        })
        .collect();
    flagged.sort();
    Ok(flagged)
}

/// Every regular file under `dir`, skipping `.git`.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScrubError> {
    let entries = fs::read_dir(dir).map_err(|source| ScrubError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ScrubError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| ScrubError::Read {
            path: path.clone(),
            source,
        })?;
        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            collect_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrubSpec;

    #[test]
    fn replaces_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notice.txt");
        fs::write(&file, "Copyright 2020 Jane Doe\ncopyright notice\n").unwrap();

        let spec = ScrubSpec::new(&["copyright".to_string()], "[REDACTED]").unwrap();
        let modified = scrub_tree(dir.path(), &spec).unwrap();
        assert_eq!(modified, 1);

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("[REDACTED]"));
        assert!(!text.to_lowercase().contains("copyright"));
    }

    #[test]
    fn binary_files_stay_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob.bin");
        let payload = [0_u8, 159, 146, 150, 255, 0, 1];
        fs::write(&file, payload).unwrap();

        let spec = ScrubSpec::new(&["copyright".to_string()], "[REDACTED]").unwrap();
        assert_eq!(scrub_tree(dir.path(), &spec).unwrap(), 0);
        assert_eq!(fs::read(&file).unwrap(), payload);
    }

    #[test]
    fn second_pass_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notice.txt");
        fs::write(&file, "Copyright 2020").unwrap();

        let spec = ScrubSpec::new(&["copyright".to_string()], "[REDACTED]").unwrap();
        assert_eq!(scrub_tree(dir.path(), &spec).unwrap(), 1);
        assert_eq!(scrub_tree(dir.path(), &spec).unwrap(), 0);
    }

    #[test]
    fn flags_sensitive_names_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("LICENSE"), "x").unwrap();
        fs::write(dir.path().join("README.md"), "x").unwrap();
        fs::write(dir.path().join("CODE_OF_CONDUCT.md"), "x").unwrap();
        fs::write(dir.path().join("main.rs"), "x").unwrap();

        let flagged = find_sensitive_files(dir.path()).unwrap();
        let names: Vec<_> = flagged
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert!(names.contains(&"LICENSE".to_string()));
        assert!(names.contains(&"README.md".to_string()));
        assert!(names.contains(&"CODE_OF_CONDUCT.md".to_string()));
        assert!(!names.contains(&"main.rs".to_string()));
    }
}
