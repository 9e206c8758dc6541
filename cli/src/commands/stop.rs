//! `proxbox stop <vm_id> [--force]`

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::vm;
use crate::commands::resource_id;
use crate::output::TerminalReporter;

#[derive(Debug, Args)]
pub struct StopArgs {
    /// VM ID
    pub vm_id: u64,

    /// Skip the VM lock check (qm stop --skiplock)
    #[arg(short, long)]
    pub force: bool,
}

/// Run `proxbox stop`.
///
/// # Errors
///
/// Returns an error if the id is invalid or `qm stop` fails.
pub async fn run(app: &AppContext, args: &StopArgs) -> Result<()> {
    let vm_id = resource_id(args.vm_id)?;
    let reporter = TerminalReporter::new(&app.output);
    vm::stop_vm(&app.hypervisor, &reporter, vm_id, args.force).await
}
