use crate::batch::Orchestrator;
use crate::cli::{work_item_from_args, RunArgs};
use crate::Result;

pub(crate) fn handle(args: RunArgs) -> Result<()> {
    let item = work_item_from_args(&args)?;
    println!("{}", Orchestrator::preview(&item, 0));
    Ok(())
}
