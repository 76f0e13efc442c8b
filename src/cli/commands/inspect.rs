use std::path::Path;

use serde::Serialize;

use crate::cli::{render, InspectArgs};
use crate::refs::{self, RefError, RepoInfo};
use crate::scrub;
use crate::workdir::WorkingCopy;
use crate::Result;

#[derive(Serialize)]
struct InspectOutput {
    #[serde(flatten)]
    info: RepoInfo,
    /// File names that match the sensitivity vocabulary, for review.
    sensitive_files: Vec<String>,
}

pub(crate) fn handle(args: InspectArgs, json: bool) -> Result<()> {
    // Local paths are opened in place; anything else gets a throwaway clone.
    let output = if Path::new(&args.source).exists() {
        let repo = git2::Repository::open(&args.source).map_err(RefError::Git)?;
        gather(&repo)?
    } else {
        let copy = WorkingCopy::acquire(&args.source)?;
        gather(copy.repo())?
    };

    if json {
        super::print_json(&output);
    } else {
        print!("{}", render::render_info(&output.info, args.limit));
        if !output.sensitive_files.is_empty() {
            println!("review (sensitive names): {}", output.sensitive_files.join(", "));
        }
    }
    Ok(())
}

fn gather(repo: &git2::Repository) -> Result<InspectOutput> {
    let info = refs::snapshot(repo)?;
    let sensitive_files = match repo.workdir() {
        Some(root) => scrub::find_sensitive_files(root)?
            .into_iter()
            .map(|path| {
                path.strip_prefix(root)
                    .unwrap_or(&path)
                    .display()
                    .to_string()
            })
            .collect(),
        // Bare repositories have no working tree to scan.
        None => Vec::new(),
    };
    Ok(InspectOutput {
        info,
        sensitive_files,
    })
}
