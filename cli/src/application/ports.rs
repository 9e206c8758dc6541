//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{ChecksumAlgorithm, Configuration};

// ── Constants ─────────────────────────────────────────────────────────────────

/// The Proxmox VE QEMU/KVM management binary.
pub const QM_BINARY: &str = "qm";

// ── Value Types ───────────────────────────────────────────────────────────────

/// Parameters for `qm create`.
pub struct CreateSpec<'a> {
    pub vm_id: u32,
    pub name: &'a str,
    pub memory_mb: u32,
    /// Bridge the first network interface is attached to, e.g. `"vmbr0"`.
    pub bridge: &'a str,
}

// ── Hypervisor Port Traits ────────────────────────────────────────────────────

/// VM lifecycle operations: create, clone, start, stop, destroy, template.
///
/// Every method fails with a `CommandError` when `qm` exits non-zero or times out.
#[allow(async_fn_in_trait)]
pub trait VmLifecycle {
    /// Create an empty VM with one virtio NIC.
    async fn create(&self, spec: &CreateSpec<'_>) -> Result<Output>;
    /// Clone `template_id` into a new VM `vm_id` named `name`.
    async fn clone_vm(&self, template_id: u32, vm_id: u32, name: &str) -> Result<Output>;
    async fn start(&self, vm_id: u32) -> Result<Output>;
    /// Stop a VM; `force` bypasses the VM lock.
    async fn stop(&self, vm_id: u32, force: bool) -> Result<Output>;
    /// Destroy a VM; `purge` also removes it from backup jobs and HA config.
    async fn destroy(&self, vm_id: u32, purge: bool) -> Result<Output>;
    /// Mark a VM as a template. Not reversible on the hypervisor.
    async fn convert_to_template(&self, vm_id: u32) -> Result<Output>;
}

/// Disk operations.
#[allow(async_fn_in_trait)]
pub trait DiskManager {
    /// Import a disk image into `data_store` as an unused disk of `vm_id`.
    async fn import_disk(&self, vm_id: u32, image: &Path, data_store: &str) -> Result<Output>;
    /// Grow `disk` by `increase_gb` gigabytes.
    async fn resize_disk(&self, vm_id: u32, disk: &str, increase_gb: u32) -> Result<Output>;
}

/// `qm set` configuration.
#[allow(async_fn_in_trait)]
pub trait VmConfigurator {
    /// Apply `--key value` options in order.
    async fn set(&self, vm_id: u32, options: &[(&str, &str)]) -> Result<Output>;
}

/// VM state inspection.
#[allow(async_fn_in_trait)]
pub trait VmInspector {
    /// `qm status`; stdout holds `key: value` lines.
    async fn status(&self, vm_id: u32) -> Result<Output>;
    /// Dump a generated cloud-init section. Does not fail on non-zero exit.
    async fn cloudinit_dump(&self, vm_id: u32, section: &str) -> Result<Output>;
}

/// Composite trait: any type implementing all four sub-traits is a `Hypervisor`.
pub trait Hypervisor: VmLifecycle + DiskManager + VmConfigurator + VmInspector {}

/// Blanket implementation: any type implementing all four sub-traits is a `Hypervisor`.
impl<T> Hypervisor for T where T: VmLifecycle + DiskManager + VmConfigurator + VmInspector {}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
///
/// Arguments are passed as a discrete vector; implementations must never go
/// through a shell.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned. On timeout the child
    /// is killed and a `CommandError` with exit code `-1` is returned.
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Download Port ─────────────────────────────────────────────────────────────

/// Fetches a URL to a local file.
///
/// Transient failures are reported as `NetworkError`; retrying is the caller's
/// decision (see `crate::application::retry`).
#[allow(async_fn_in_trait)]
pub trait Downloader {
    /// On success `dest` holds the full response body.
    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit an informational message.
    fn info(&self, message: &str);
    /// Emit a block of verbatim detail text under a title.
    fn detail(&self, title: &str, body: &str);
}

// ── Filesystem Ports ──────────────────────────────────────────────────────────

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Stream `path` through `algorithm` and return the lowercase hex digest.
    fn digest_file(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String>;
}

/// Abstracts the filesystem operations the image cache needs.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Produces a validated configuration, or fails without producing one.
pub trait ConfigProvider {
    fn load(&self) -> Result<Configuration>;
    /// Path of the settings file that was (or would be) read.
    fn settings_path(&self) -> Option<PathBuf>;
}
