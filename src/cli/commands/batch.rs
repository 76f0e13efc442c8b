use std::time::Duration;

use crate::batch::Orchestrator;
use crate::cli::{render, BatchArgs};
use crate::config;
use crate::Result;

pub(crate) fn handle(args: BatchArgs, json: bool) -> Result<()> {
    let items = config::load_batch_file(&args.file)?;
    tracing::info!(repos = items.len(), workers = args.workers, "starting batch");

    let orchestrator = Orchestrator::new();
    if let Some(secs) = args.timeout_secs {
        orchestrator.cancel_after(Duration::from_secs(secs));
    }
    let report = orchestrator.run(&items, args.workers.max(1));
    if json {
        super::print_json(&report);
    } else {
        print!("{}", render::render_report(&report));
    }
    report.into_result().map(|_| ())
}
