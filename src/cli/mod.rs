//! CLI surface for reweave.
//!
//! Goal:
//! - One-shot `run` for a single repository, `batch` for a worklist
//! - Extensible command tree + thin handlers
//! - Everything lowers into the same validated work items the library
//!   exposes, so flags and batch files cannot drift apart

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{self, ItemLayer, WorkItem};
use crate::{Error, Result};

mod commands;
mod render;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "rwv",
    version,
    about = "Batch git history rewriter",
    infer_subcommands = true,
    infer_long_args = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output (default: false; use `--json` for scripting).
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Errors only.
    #[arg(short = 'q', long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite one repository.
    Run(RunArgs),

    /// Rewrite every repository in a TOML worklist.
    Batch(BatchArgs),

    /// Show what a run would do, without cloning anything.
    #[command(alias = "plan")]
    Preview(RunArgs),

    /// Show branches, remotes, and history of a repository.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Clone URL or local path of the repository to rewrite.
    pub source: String,

    /// Substitute author/committer name (requires --email).
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,

    /// Substitute author/committer email (requires --author).
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Assign random commit timestamps within the date window.
    #[arg(long, default_value_t = false)]
    pub randomize_dates: bool,

    /// Start of the date window (rfc3339 or yyyy-mm-dd; default: one year ago).
    #[arg(long, value_name = "WHEN")]
    pub date_start: Option<String>,

    /// End of the date window (rfc3339 or yyyy-mm-dd; default: now).
    #[arg(long, value_name = "WHEN")]
    pub date_end: Option<String>,

    /// Case-insensitive content pattern to scrub (repeatable).
    #[arg(long = "pattern", value_name = "REGEX")]
    pub patterns: Vec<String>,

    /// Replacement for scrubbed matches (default: remove the match).
    #[arg(long, value_name = "TEXT")]
    pub replacement: Option<String>,

    /// Branch rename as OLD=NEW (repeatable).
    #[arg(long = "rename", value_name = "OLD=NEW")]
    pub renames: Vec<String>,

    /// Existing remote to force-push to. Mutually exclusive with --token.
    #[arg(long, value_name = "URL", conflicts_with = "token")]
    pub destination: Option<String>,

    /// Hosting API token; provisions a fresh repository to push to.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Name for the provisioned repository; {repo} and {index} expand.
    #[arg(long, value_name = "TEMPLATE", requires = "token")]
    pub name_template: Option<String>,

    /// Provision the destination as a public repository.
    #[arg(long, default_value_t = false)]
    pub public: bool,

    /// Cancel the run after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// TOML worklist with [defaults] and [[repos]] entries.
    pub file: PathBuf,

    /// Parallel worker lanes.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub workers: usize,

    /// Cancel the batch after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Clone URL or local path of the repository to inspect.
    pub source: String,

    /// Show at most this many commits.
    #[arg(long, default_value_t = 20, value_name = "N")]
    pub limit: usize,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run::handle(args, cli.json),
        Commands::Batch(args) => commands::batch::handle(args, cli.json),
        Commands::Preview(args) => commands::preview::handle(args),
        Commands::Inspect(args) => commands::inspect::handle(args, cli.json),
    }
}

/// Lower run flags to a validated work item through the same layer
/// merge the batch file uses.
fn work_item_from_args(args: &RunArgs) -> Result<WorkItem> {
    let layer = ItemLayer {
        author: args.author.clone(),
        email: args.email.clone(),
        randomize_dates: if args.randomize_dates { Some(true) } else { None },
        date_start: args.date_start.clone(),
        date_end: args.date_end.clone(),
        patterns: if args.patterns.is_empty() {
            None
        } else {
            Some(args.patterns.clone())
        },
        replacement: args.replacement.clone(),
        branches: if args.renames.is_empty() {
            None
        } else {
            Some(parse_renames(&args.renames)?)
        },
        destination: args.destination.clone(),
        token: args.token.clone(),
        name_template: args.name_template.clone(),
        private: Some(!args.public),
    };
    let item = config::work_item_from_layers(&args.source, &ItemLayer::default(), &layer)?;
    Ok(item)
}

fn parse_renames(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut renames = BTreeMap::new();
    for entry in raw {
        let (old, new) = entry.split_once('=').ok_or_else(|| {
            Error::Config(config::ConfigError::BadRename(entry.clone()))
        })?;
        if old.is_empty() || new.is_empty() {
            return Err(Error::Config(config::ConfigError::BadRename(entry.clone())));
        }
        renames.insert(old.to_string(), new.to_string());
    }
    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Destination;

    #[test]
    fn run_flags_lower_to_work_item() {
        let cli = parse_from([
            "rwv",
            "run",
            "https://example.com/org/proj.git",
            "--author",
            "Jane",
            "--email",
            "jane@example.com",
            "--randomize-dates",
            "--date-start",
            "2020-01-01",
            "--date-end",
            "2021-01-01",
            "--pattern",
            "secret",
            "--rename",
            "master=main",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let item = work_item_from_args(&args).unwrap();
        assert_eq!(item.identity.as_ref().unwrap().name, "Jane");
        assert!(item.randomize.is_some());
        assert_eq!(item.scrub.as_ref().unwrap().patterns.len(), 1);
        assert_eq!(item.renames.get("master").map(String::as_str), Some("main"));
        assert!(matches!(item.destination, Destination::None));
    }

    #[test]
    fn malformed_rename_is_rejected() {
        assert!(parse_renames(&["no-equals".to_string()]).is_err());
        assert!(parse_renames(&["=x".to_string()]).is_err());
    }

    #[test]
    fn destination_and_token_conflict() {
        let result = Cli::try_parse_from([
            "rwv",
            "run",
            "src",
            "--destination",
            "url",
            "--token",
            "t",
        ]);
        assert!(result.is_err());
    }
}
