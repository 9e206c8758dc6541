//! Infrastructure implementation of the hypervisor port traits.
//!
//! `QmProvisioner<R>` turns each port call into one `qm` invocation through a
//! `CommandRunner` and converts non-zero exits into `CommandError`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    CommandRunner, CreateSpec, DiskManager, QM_BINARY, VmConfigurator, VmInspector, VmLifecycle,
};
use crate::domain::CommandError;
use crate::infra::command_runner::{
    DEFAULT_CMD_TIMEOUT, IMPORT_TIMEOUT, TokioCommandRunner, command_line,
};

/// Routes every hypervisor operation through `qm`.
///
/// Generic over `R: CommandRunner` so tests can inject a recording runner
/// without spawning processes.
pub struct QmProvisioner<R: CommandRunner> {
    runner: R,
    import_timeout: Duration,
}

impl<R: CommandRunner> QmProvisioner<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            import_timeout: IMPORT_TIMEOUT,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn qm(&self, args: &[&str]) -> Result<Output> {
        let output = self
            .runner
            .run(QM_BINARY, args)
            .await
            .with_context(|| format!("qm {}", args.first().copied().unwrap_or_default()))?;
        check(args, output)
    }
}

impl QmProvisioner<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
    }
}

fn check(args: &[&str], output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    Err(CommandError {
        command: command_line(QM_BINARY, args),
        // Killed by a signal has no code.
        exit_code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
    .into())
}

impl<R: CommandRunner> VmLifecycle for QmProvisioner<R> {
    async fn create(&self, spec: &CreateSpec<'_>) -> Result<Output> {
        let id = spec.vm_id.to_string();
        let memory = spec.memory_mb.to_string();
        let net = format!("virtio,bridge={}", spec.bridge);
        self.qm(&[
            "create", &id, "--name", spec.name, "--memory", &memory, "--net0", &net,
        ])
        .await
    }

    async fn clone_vm(&self, template_id: u32, vm_id: u32, name: &str) -> Result<Output> {
        let template = template_id.to_string();
        let id = vm_id.to_string();
        self.qm(&["clone", &template, &id, "--name", name]).await
    }

    async fn start(&self, vm_id: u32) -> Result<Output> {
        self.qm(&["start", &vm_id.to_string()]).await
    }

    async fn stop(&self, vm_id: u32, force: bool) -> Result<Output> {
        let id = vm_id.to_string();
        let mut args = vec!["stop", id.as_str()];
        if force {
            args.push("--skiplock");
        }
        self.qm(&args).await
    }

    async fn destroy(&self, vm_id: u32, purge: bool) -> Result<Output> {
        let id = vm_id.to_string();
        let mut args = vec!["destroy", id.as_str()];
        if purge {
            args.push("--purge");
        }
        self.qm(&args).await
    }

    async fn convert_to_template(&self, vm_id: u32) -> Result<Output> {
        self.qm(&["template", &vm_id.to_string()]).await
    }
}

impl<R: CommandRunner> DiskManager for QmProvisioner<R> {
    async fn import_disk(&self, vm_id: u32, image: &Path, data_store: &str) -> Result<Output> {
        let id = vm_id.to_string();
        let image = image.to_string_lossy();
        let args: [&str; 6] = ["importdisk", &id, &image, data_store, "-format", "qcow2"];
        let output = self
            .runner
            .run_with_timeout(QM_BINARY, &args, self.import_timeout)
            .await
            .context("qm importdisk")?;
        check(&args, output)
    }

    async fn resize_disk(&self, vm_id: u32, disk: &str, increase_gb: u32) -> Result<Output> {
        let id = vm_id.to_string();
        let delta = format!("+{increase_gb}G");
        self.qm(&["resize", &id, disk, &delta]).await
    }
}

impl<R: CommandRunner> VmConfigurator for QmProvisioner<R> {
    async fn set(&self, vm_id: u32, options: &[(&str, &str)]) -> Result<Output> {
        let id = vm_id.to_string();
        let mut args = vec!["set", id.as_str()];
        for (key, value) in options {
            args.push(*key);
            args.push(*value);
        }
        self.qm(&args).await
    }
}

impl<R: CommandRunner> VmInspector for QmProvisioner<R> {
    async fn status(&self, vm_id: u32) -> Result<Output> {
        self.qm(&["status", &vm_id.to_string()]).await
    }

    async fn cloudinit_dump(&self, vm_id: u32, section: &str) -> Result<Output> {
        // Exit code is not checked.
        self.runner
            .run(QM_BINARY, &["cloudinit", "dump", &vm_id.to_string(), section])
            .await
            .context("qm cloudinit dump")
    }
}
