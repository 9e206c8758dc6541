//! `proxbox delete <vm_id> [--no-purge] [--yes]`: destroy a VM.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::vm;
use crate::commands::resource_id;
use crate::output::TerminalReporter;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// VM ID
    pub vm_id: u64,

    /// Keep backup-job and HA references to the VM
    #[arg(long)]
    pub no_purge: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Run `proxbox delete`.
///
/// # Errors
///
/// Returns an error if the id is invalid, the prompt fails, or `qm destroy`
/// fails.
pub async fn run(app: &AppContext, args: &DeleteArgs) -> Result<()> {
    let vm_id = resource_id(args.vm_id)?;
    let ctx = &app.output;

    if !args.yes && !app.confirm(&format!("Destroy VM {vm_id}? This cannot be undone"))? {
        ctx.info("Cancelled.");
        return Ok(());
    }

    let reporter = TerminalReporter::new(ctx);
    vm::delete_vm(&app.hypervisor, &reporter, vm_id, !args.no_purge).await
}
