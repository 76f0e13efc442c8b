//! Branch renames, remote configuration, and inspection snapshots.

use reweave::refs::{self, RefError};
use reweave::test_harness::FixtureRepo;

fn fixture() -> FixtureRepo {
    let fx = FixtureRepo::new();
    fx.commit_file("a.txt", "x", "first", ("A", "a@x.com"), 1_000);
    fx
}

#[test]
fn rename_moves_head_along() {
    let fx = fixture();
    refs::rename_branch(fx.repo(), "main", "trunk").unwrap();
    assert_eq!(fx.branch_names(), vec!["trunk"]);
    assert_eq!(fx.head_branch(), "trunk");
}

#[test]
fn rename_of_missing_branch_fails() {
    let fx = fixture();
    let err = refs::rename_branch(fx.repo(), "nope", "x").unwrap_err();
    assert!(matches!(err, RefError::NotFound(name) if name == "nope"));
}

#[test]
fn rename_onto_existing_branch_fails() {
    let fx = fixture();
    fx.branch_from_head("release");
    let err = refs::rename_branch(fx.repo(), "main", "release").unwrap_err();
    assert!(matches!(err, RefError::AlreadyExists(name) if name == "release"));
}

#[test]
fn rename_to_same_name_is_a_noop() {
    let fx = fixture();
    refs::rename_branch(fx.repo(), "main", "main").unwrap();
    assert_eq!(fx.branch_names(), vec!["main"]);
}

#[test]
fn configure_origin_creates_then_replaces() {
    let fx = fixture();
    refs::configure_origin(fx.repo(), "https://example.com/one.git").unwrap();
    refs::configure_origin(fx.repo(), "https://example.com/two.git").unwrap();

    let remote = fx.repo().find_remote("origin").unwrap();
    assert_eq!(remote.url().unwrap(), "https://example.com/two.git");
    assert_eq!(fx.repo().remotes().unwrap().len(), 1);
}

#[test]
fn snapshot_reports_branches_remotes_and_history() {
    let fx = fixture();
    fx.commit_file("b.txt", "y", "second", ("B", "b@x.com"), 2_000);
    fx.branch_from_head("release");
    refs::configure_origin(fx.repo(), "https://example.com/one.git").unwrap();

    let info = refs::snapshot(fx.repo()).unwrap();
    assert_eq!(info.branches, vec!["main", "release"]);
    assert_eq!(info.remotes.len(), 1);
    assert_eq!(info.remotes[0].name, "origin");
    assert_eq!(info.commits.len(), 2);
    assert_eq!(info.commits[0].summary, "second");
    assert_eq!(info.commits[0].author, "B");
    assert!(info.commits[0].date.starts_with("1970-01-01T00:33:20"));
}
