//! VM workflow: clone from a template, plus single-step lifecycle operations.
//!
//! Imports only from `crate::domain` and `crate::application`.

use anyhow::Result;

use crate::application::ports::{Hypervisor, ProgressReporter, VmInspector, VmLifecycle};
use crate::application::services::template::{as_pairs, boot_options};
use crate::domain::validate::validate_default_id;
use crate::domain::workflow::vm_steps as steps;
use crate::domain::{Configuration, VmCreationError, VmPlan, VmRequest, VmStatus, WorkflowRun};

/// Clone a template into a new VM, configure it, and optionally start it.
///
/// # Errors
///
/// Returns a bare `ValidationError` for bad ids or names. Hypervisor
/// failures are wrapped in a [`VmCreationError`] naming both ids.
pub async fn create_vm(
    hv: &impl Hypervisor,
    reporter: &impl ProgressReporter,
    config: &Configuration,
    req: &VmRequest,
) -> Result<VmPlan> {
    let plan = VmPlan::resolve(req)?;
    let mut run = WorkflowRun::new();

    if let Err(source) = execute(hv, reporter, config, &plan, &mut run).await {
        let step = run.current().unwrap_or(steps::CLONE);
        return Err(VmCreationError {
            vm_id: plan.vm_id,
            template_id: plan.template_id,
            step,
            source,
        }
        .into());
    }
    run.finish();

    reporter.success(&format!(
        "VM {} ({}) created from template {}",
        plan.vm_id, plan.name, plan.template_id
    ));
    Ok(plan)
}

async fn execute(
    hv: &impl Hypervisor,
    reporter: &impl ProgressReporter,
    config: &Configuration,
    plan: &VmPlan,
    run: &mut WorkflowRun,
) -> Result<()> {
    let id = plan.vm_id;

    run.begin(steps::CLONE);
    reporter.step(&format!("Cloning template {} to VM {id}", plan.template_id));
    hv.clone_vm(plan.template_id, id, &plan.name).await?;

    run.begin(steps::CONFIGURE_HARDWARE);
    reporter.step("Configuring hardware");
    let boot = boot_options(config.data_store());
    hv.set(id, &as_pairs(&boot)).await?;

    if plan.configure_network {
        run.begin(steps::CONFIGURE_NETWORK);
        reporter.step("Configuring network (DHCP)");
        hv.set(id, &[("--ipconfig0", "ip=dhcp")]).await?;
    }

    if plan.start {
        run.begin(steps::START);
        reporter.step(&format!("Starting VM {id}"));
        hv.start(id).await?;
    }
    Ok(())
}

/// # Errors
///
/// Returns the underlying `ValidationError` or `CommandError` unwrapped.
pub async fn start_vm(
    hv: &impl VmLifecycle,
    reporter: &impl ProgressReporter,
    vm_id: u32,
) -> Result<()> {
    let vm_id = validate_default_id(vm_id)?;
    hv.start(vm_id).await?;
    reporter.success(&format!("VM {vm_id} started"));
    Ok(())
}

/// Stop a VM; `force` skips the lock check.
///
/// # Errors
///
/// Returns the underlying `ValidationError` or `CommandError` unwrapped.
pub async fn stop_vm(
    hv: &impl VmLifecycle,
    reporter: &impl ProgressReporter,
    vm_id: u32,
    force: bool,
) -> Result<()> {
    let vm_id = validate_default_id(vm_id)?;
    hv.stop(vm_id, force).await?;
    reporter.success(&format!("VM {vm_id} stopped"));
    Ok(())
}

/// Destroy a VM; `purge` also drops it from backup and HA configuration.
///
/// # Errors
///
/// Returns the underlying `ValidationError` or `CommandError` unwrapped.
pub async fn delete_vm(
    hv: &impl VmLifecycle,
    reporter: &impl ProgressReporter,
    vm_id: u32,
    purge: bool,
) -> Result<()> {
    let vm_id = validate_default_id(vm_id)?;
    hv.destroy(vm_id, purge).await?;
    reporter.success(&format!("VM {vm_id} deleted"));
    Ok(())
}

/// # Errors
///
/// Returns the underlying `ValidationError` or `CommandError` unwrapped.
pub async fn get_vm_status(hv: &impl VmInspector, vm_id: u32) -> Result<VmStatus> {
    let vm_id = validate_default_id(vm_id)?;
    let output = hv.status(vm_id).await?;
    Ok(VmStatus::parse(&String::from_utf8_lossy(&output.stdout)))
}
