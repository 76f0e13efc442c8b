//! Push behavior against local bare remotes.

use reweave::config::Identity;
use reweave::test_harness::FixtureRepo;
use reweave::{publish, refs, rewrite};

#[test]
fn push_sends_the_current_branch() {
    let src = FixtureRepo::new();
    src.commit_file("a.txt", "x", "first", ("A", "a@x.com"), 1_000);
    let dest = FixtureRepo::new_bare();
    refs::configure_origin(src.repo(), &dest.url()).unwrap();

    let branch = publish::push_current_branch(src.repo()).unwrap();
    assert_eq!(branch, "main");

    let pushed = dest
        .repo()
        .find_reference("refs/heads/main")
        .unwrap()
        .target()
        .unwrap();
    let local = src.repo().head().unwrap().target().unwrap();
    assert_eq!(pushed, local);
}

#[test]
fn push_overwrites_diverged_remote_history() {
    let src = FixtureRepo::new();
    src.commit_file("a.txt", "x", "first", ("A", "a@x.com"), 1_000);
    let dest = FixtureRepo::new_bare();
    refs::configure_origin(src.repo(), &dest.url()).unwrap();
    publish::push_current_branch(src.repo()).unwrap();
    let old_tip = dest
        .repo()
        .find_reference("refs/heads/main")
        .unwrap()
        .target()
        .unwrap();

    // Rewriting replaces every object, so the second push is not a
    // fast-forward. The forced refspec must still land it.
    let identity = Identity::new("B", "b@x.com").unwrap();
    rewrite::rewrite_history(src.repo(), Some(&identity), None).unwrap();
    publish::push_current_branch(src.repo()).unwrap();

    let new_tip = dest
        .repo()
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_ne!(new_tip.id(), old_tip);
    assert_eq!(new_tip.author().name().unwrap(), "B");
}

#[test]
fn push_from_renamed_branch_uses_the_new_name() {
    let src = FixtureRepo::new();
    src.commit_file("a.txt", "x", "first", ("A", "a@x.com"), 1_000);
    refs::rename_branch(src.repo(), "main", "trunk").unwrap();
    let dest = FixtureRepo::new_bare();
    refs::configure_origin(src.repo(), &dest.url()).unwrap();

    let branch = publish::push_current_branch(src.repo()).unwrap();
    assert_eq!(branch, "trunk");
    assert!(dest.repo().find_reference("refs/heads/trunk").is_ok());
    assert!(dest.repo().find_reference("refs/heads/main").is_err());
}
