use std::time::Duration;

use crate::batch::Orchestrator;
use crate::cli::{render, work_item_from_args, RunArgs};
use crate::Result;

pub(crate) fn handle(args: RunArgs, json: bool) -> Result<()> {
    let item = work_item_from_args(&args)?;
    let orchestrator = Orchestrator::new();
    if let Some(secs) = args.timeout_secs {
        orchestrator.cancel_after(Duration::from_secs(secs));
    }
    let report = orchestrator.run(std::slice::from_ref(&item), 1);
    if json {
        super::print_json(&report);
    } else {
        print!("{}", render::render_report(&report));
    }
    report.into_result().map(|_| ())
}
