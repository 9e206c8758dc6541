//! `proxbox status <vm_id>`: print the parsed `qm status` fields.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::vm;
use crate::commands::{VmIdArg, resource_id};
use crate::domain::VmStatus;
use crate::output::{OutputContext, json};

/// Run `proxbox status`.
///
/// # Errors
///
/// Returns an error if the id is invalid or `qm status` fails.
pub async fn run(app: &AppContext, args: &VmIdArg) -> Result<()> {
    let vm_id = resource_id(args.vm_id)?;
    let status = vm::get_vm_status(&app.hypervisor, vm_id).await?;

    if app.json {
        println!("{}", json::to_pretty(&status)?);
    } else {
        render(&app.output, vm_id, &status);
    }
    Ok(())
}

fn render(ctx: &OutputContext, vm_id: u32, status: &VmStatus) {
    ctx.header(&headline(vm_id, status));
    if status.is_empty() {
        ctx.info("qm status reported nothing");
        return;
    }
    let width = status.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in status.iter() {
        ctx.kv(key, value, width);
    }
}

fn headline(vm_id: u32, status: &VmStatus) -> String {
    match status.state() {
        Some(state) => format!("VM {vm_id}: {state}"),
        None => format!("VM {vm_id}"),
    }
}
