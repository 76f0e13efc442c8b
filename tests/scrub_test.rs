//! Content scrubbing against real working trees.

use reweave::config::{Identity, ScrubSpec};
use reweave::scrub::{self, SCRUB_COMMIT_MESSAGE};
use reweave::test_harness::FixtureRepo;

#[test]
fn scrub_appends_one_commit_with_the_given_identity() {
    let fx = FixtureRepo::new();
    fx.commit_file(
        "notes.txt",
        "Copyright Old Corp\nplain line\n",
        "add notes",
        ("Old Author", "old@example.com"),
        1_000,
    );

    let spec = ScrubSpec::new(&["old corp".to_string()], "Acme").unwrap();
    let identity = Identity::new("New Name", "new@example.com").unwrap();
    let modified = scrub::scrub_and_commit(fx.repo(), &spec, Some(&identity)).unwrap();
    assert_eq!(modified, 1);

    assert_eq!(fx.commit_count(), 2);
    let head = fx.repo().head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message().unwrap(), SCRUB_COMMIT_MESSAGE);
    assert_eq!(head.author().name().unwrap(), "New Name");

    let text = std::fs::read_to_string(fx.path().join("notes.txt")).unwrap();
    assert_eq!(text, "Copyright Acme\nplain line\n");
}

#[test]
fn scrub_without_matches_commits_nothing() {
    let fx = FixtureRepo::new();
    fx.commit_file(
        "notes.txt",
        "nothing sensitive here\n",
        "add notes",
        ("Old Author", "old@example.com"),
        1_000,
    );

    let spec = ScrubSpec::new(&["secret".to_string()], "").unwrap();
    let modified = scrub::scrub_and_commit(fx.repo(), &spec, None).unwrap();
    assert_eq!(modified, 0);
    assert_eq!(fx.commit_count(), 1);
}

#[test]
fn scrubbed_change_set_lands_in_the_commit_tree() {
    let fx = FixtureRepo::new();
    fx.commit_file(
        "a.txt",
        "token=SECRET123\n",
        "add a",
        ("Old Author", "old@example.com"),
        1_000,
    );
    fx.commit_file(
        "sub/b.txt",
        "no secret123 anywhere... actually yes\n",
        "add b",
        ("Old Author", "old@example.com"),
        2_000,
    );

    let spec = ScrubSpec::new(&["secret123".to_string()], "[gone]").unwrap();
    let modified = scrub::scrub_and_commit(fx.repo(), &spec, None).unwrap();
    assert_eq!(modified, 2);

    let head = fx.repo().head().unwrap().peel_to_commit().unwrap();
    let tree = head.tree().unwrap();
    let entry = tree.get_path(std::path::Path::new("a.txt")).unwrap();
    let blob = fx.repo().find_blob(entry.id()).unwrap();
    let committed = std::str::from_utf8(blob.content()).unwrap();
    assert_eq!(committed, "token=[gone]\n");
}

#[test]
fn sensitive_file_names_are_flagged_for_review() {
    let fx = FixtureRepo::new();
    fx.commit_file("LICENSE", "MIT", "license", ("A", "a@x.com"), 1_000);
    fx.commit_file("src/main.rs", "fn main() {}", "code", ("A", "a@x.com"), 2_000);

    let flagged = scrub::find_sensitive_files(fx.path()).unwrap();
    let names: Vec<_> = flagged
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    assert_eq!(names, vec!["LICENSE"]);
}
