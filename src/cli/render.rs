//! Human renderer for CLI outputs.
//!
//! This module is pure formatting; handlers gather any extra data needed.
//! `--json` bypasses it entirely and serializes the same structs.

use crate::batch::BatchReport;
use crate::refs::RepoInfo;

pub fn render_report(report: &BatchReport) -> String {
    let mut out = String::new();
    for item in &report.items {
        if item.succeeded {
            out.push_str(&format!("ok   {}\n", item.source));
        } else {
            out.push_str(&format!("FAIL {}\n", item.source));
        }
        let steps: Vec<&str> = item.completed.iter().map(|s| s.as_str()).collect();
        out.push_str(&format!("     steps: {}\n", steps.join(", ")));
        if let Some(failure) = &item.failure {
            out.push_str(&format!(
                "     error at {} ({}): {}\n",
                failure.step.as_str(),
                failure.kind.as_str(),
                failure.message
            ));
        }
    }
    out.push_str(&format!(
        "{} succeeded, {} failed\n",
        report.succeeded(),
        report.failed()
    ));
    out
}

pub fn render_info(info: &RepoInfo, limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("branches: {}\n", info.branches.join(", ")));
    for remote in &info.remotes {
        out.push_str(&format!("remote {}: {}\n", remote.name, remote.url));
    }
    out.push_str(&format!("commits: {}\n", info.commits.len()));
    for commit in info.commits.iter().take(limit) {
        out.push_str(&format!(
            "  {} {} {} <{}> {}\n",
            &commit.id[..commit.id.len().min(8)],
            commit.date,
            commit.author,
            commit.email,
            commit.summary
        ));
    }
    if info.commits.len() > limit {
        out.push_str(&format!("  ... {} more\n", info.commits.len() - limit));
    }
    out
}
