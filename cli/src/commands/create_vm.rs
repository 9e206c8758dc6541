//! `proxbox create-vm <template_id> <vm_id> <vm_name>`: clone a template.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::vm;
use crate::commands::resource_id;
use crate::domain::{Settings, VmRequest};
use crate::output::TerminalReporter;

#[derive(Debug, Args)]
pub struct CreateVmArgs {
    /// Template to clone
    pub template_id: u64,

    /// ID of the new VM
    pub vm_id: u64,

    /// Name of the new VM; characters outside [A-Za-z0-9_-] are removed
    pub vm_name: String,

    /// Start the VM once configured
    #[arg(long)]
    pub start: bool,

    /// Leave network configuration as cloned
    #[arg(long)]
    pub no_network: bool,

    /// Proxmox storage holding the cloud-init drive
    #[arg(short = 's', long)]
    pub data_store: Option<String>,
}

/// Run `proxbox create-vm`.
///
/// # Errors
///
/// Returns an error if validation fails or any workflow step fails.
pub async fn run(app: &AppContext, args: &CreateVmArgs) -> Result<()> {
    let template_id = resource_id(args.template_id)?;
    let vm_id = resource_id(args.vm_id)?;
    let config = app.load_config(Settings {
        data_store: args.data_store.clone(),
        ..Settings::default()
    })?;

    let req = VmRequest {
        start: args.start,
        configure_network: !args.no_network,
        ..VmRequest::new(template_id, vm_id, args.vm_name.as_str())
    };

    let reporter = TerminalReporter::new(&app.output);
    let plan = vm::create_vm(&app.hypervisor, &reporter, &config, &req).await?;

    if !plan.start {
        app.output
            .info(&format!("Start it with: proxbox start {}", plan.vm_id));
    }
    Ok(())
}
