//! `proxbox start <vm_id>`

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::vm;
use crate::commands::{VmIdArg, resource_id};
use crate::output::TerminalReporter;

/// Run `proxbox start`.
///
/// # Errors
///
/// Returns an error if the id is invalid or `qm start` fails.
pub async fn run(app: &AppContext, args: &VmIdArg) -> Result<()> {
    let vm_id = resource_id(args.vm_id)?;
    let reporter = TerminalReporter::new(&app.output);
    vm::start_vm(&app.hypervisor, &reporter, vm_id).await
}
