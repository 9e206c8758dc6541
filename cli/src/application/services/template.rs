//! Template workflow: cloud image to Proxmox template in nine ordered steps.
//!
//! Steps run strictly in order and the first failure aborts the rest. Nothing
//! already done on the hypervisor is undone on failure.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    CreateSpec, Downloader, FileHasher, Hypervisor, LocalFs, ProgressReporter,
};
use crate::application::retry::{RetryPolicy, is_network_error};
use crate::application::services::checksum::{verify_checksum, verify_with};
use crate::domain::workflow::template_steps as steps;
use crate::domain::{
    ChecksumMismatch, Configuration, TemplateCreationError, TemplatePlan, TemplateRequest,
    WorkflowRun,
};

/// Disk the imported image is attached as.
pub const BOOT_DISK: &str = "scsi0";

/// Boot, cloud-init drive and serial console options shared by templates and
/// their clones.
pub fn boot_options(data_store: &str) -> [(&'static str, String); 5] {
    [
        ("--ide2", format!("{data_store}:cloudinit")),
        ("--boot", "c".to_string()),
        ("--bootdisk", BOOT_DISK.to_string()),
        ("--serial0", "socket".to_string()),
        ("--vga", "serial0".to_string()),
    ]
}

pub(crate) fn as_pairs<'a>(options: &'a [(&'static str, String)]) -> Vec<(&'a str, &'a str)> {
    options.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

/// Builds templates against one hypervisor with one configuration.
pub struct TemplateWorkflow<'a, H, D, F, X, R> {
    hypervisor: &'a H,
    downloader: &'a D,
    fs: &'a F,
    hasher: &'a X,
    reporter: &'a R,
    config: &'a Configuration,
    retry: RetryPolicy,
}

impl<'a, H, D, F, X, R> TemplateWorkflow<'a, H, D, F, X, R>
where
    H: Hypervisor,
    D: Downloader,
    F: LocalFs,
    X: FileHasher,
    R: ProgressReporter,
{
    pub fn new(
        hypervisor: &'a H,
        downloader: &'a D,
        fs: &'a F,
        hasher: &'a X,
        reporter: &'a R,
        config: &'a Configuration,
    ) -> Self {
        Self {
            hypervisor,
            downloader,
            fs,
            hasher,
            reporter,
            config,
            retry: RetryPolicy::exponential(config.max_retries()),
        }
    }

    /// Replace the download retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a template from `req`.
    ///
    /// # Errors
    ///
    /// Returns a bare `ValidationError` if the request is invalid (nothing is
    /// sent to the hypervisor). Any later failure is wrapped in a
    /// [`TemplateCreationError`] naming the step that failed.
    pub async fn create_template(&self, req: &TemplateRequest) -> Result<TemplatePlan> {
        let plan = TemplatePlan::resolve(req, self.config)?;
        let mut run = WorkflowRun::new();

        if let Err(source) = self.execute(&plan, &mut run).await {
            let step = run.current().unwrap_or(steps::RESOLVE_IMAGE);
            tracing::debug!(template_id = plan.template_id, step, completed = ?run.completed(), "template workflow failed");
            return Err(TemplateCreationError {
                template_id: plan.template_id,
                step,
                source,
            }
            .into());
        }
        run.finish();

        self.reporter.success(&format!(
            "Template {} ({}) created",
            plan.template_id, plan.name
        ));
        Ok(plan)
    }

    async fn execute(&self, plan: &TemplatePlan, run: &mut WorkflowRun) -> Result<()> {
        let id = plan.template_id;
        let store = self.config.data_store();

        run.begin(steps::RESOLVE_IMAGE);
        self.reporter.info(&format!(
            "Ubuntu {} ({}) image: {}",
            plan.release.version(),
            plan.release,
            plan.image_url
        ));

        run.begin(steps::ENSURE_IMAGE);
        self.ensure_image(plan).await?;

        run.begin(steps::CREATE_VM);
        self.reporter
            .step(&format!("Creating VM {id} ({}, {} MB)", plan.name, plan.memory_mb));
        self.hypervisor
            .create(&CreateSpec {
                vm_id: id,
                name: &plan.name,
                memory_mb: plan.memory_mb,
                bridge: self.config.vm_bridge(),
            })
            .await?;

        run.begin(steps::IMPORT_DISK);
        self.reporter.step(&format!("Importing disk into {store}"));
        self.hypervisor
            .import_disk(id, &plan.image_path, store)
            .await?;

        run.begin(steps::CONFIGURE_HARDWARE);
        self.reporter.step("Configuring hardware");
        let disk = format!("{store}:vm-{id}-disk-0");
        self.hypervisor
            .set(id, &[("--scsihw", "virtio-scsi-pci"), ("--scsi0", &disk)])
            .await?;
        let boot = boot_options(store);
        self.hypervisor.set(id, &as_pairs(&boot)).await?;

        run.begin(steps::RESIZE_DISK);
        if plan.disk_increase_gb > 0 {
            self.reporter
                .step(&format!("Growing {BOOT_DISK} by {} GB", plan.disk_increase_gb));
            self.hypervisor
                .resize_disk(id, BOOT_DISK, plan.disk_increase_gb)
                .await?;
        } else {
            tracing::debug!(template_id = id, "disk increase is 0, not resizing");
        }

        run.begin(steps::CONFIGURE_CLOUD_INIT);
        self.configure_cloud_init(id).await?;

        run.begin(steps::CONVERT_TO_TEMPLATE);
        self.reporter.step("Converting to template");
        self.hypervisor.convert_to_template(id).await?;

        run.begin(steps::CLEANUP);
        self.cleanup(plan);
        Ok(())
    }

    async fn ensure_image(&self, plan: &TemplatePlan) -> Result<()> {
        let path = plan.image_path.as_path();

        if self.fs.exists(path) {
            let Some(expected) = &plan.checksum else {
                self.reporter
                    .info(&format!("Using cached image {}", path.display()));
                return Ok(());
            };
            if verify_checksum(self.hasher, path, &expected.hex, expected.algorithm)? {
                self.reporter
                    .info(&format!("Using cached image {} (checksum verified)", path.display()));
                return Ok(());
            }
            self.reporter.warn(&format!(
                "Cached image {} does not match the expected {}; downloading again",
                path.display(),
                expected.algorithm
            ));
            self.fs
                .remove_file(path)
                .with_context(|| format!("removing stale image {}", path.display()))?;
        }

        self.download(plan, path).await?;

        if let Some(expected) = &plan.checksum {
            let (matches, actual) =
                verify_with(self.hasher, path, &expected.hex, expected.algorithm)?;
            if !matches {
                return Err(ChecksumMismatch {
                    path: path.to_path_buf(),
                    algorithm: expected.algorithm.to_string(),
                    expected: expected.hex.trim().to_lowercase(),
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    async fn download(&self, plan: &TemplatePlan, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            self.fs
                .create_dir_all(dir)
                .with_context(|| format!("creating image directory {}", dir.display()))?;
        }
        self.reporter.step(&format!("Downloading {}", plan.image_url));
        let timeout = Duration::from_secs(self.config.download_timeout_seconds());
        self.retry
            .run(
                |_| self.downloader.download(&plan.image_url, path, timeout),
                is_network_error,
            )
            .await?;
        self.reporter
            .success(&format!("Downloaded {}", path.display()));
        Ok(())
    }

    async fn configure_cloud_init(&self, id: u32) -> Result<()> {
        self.reporter.step("Configuring cloud-init");
        self.hypervisor.set(id, &[("--ipconfig0", "ip=dhcp")]).await?;

        match self.config.ssh_key_path() {
            Some(key) => {
                let key = key.to_string_lossy();
                self.hypervisor.set(id, &[("--sshkey", &key)]).await?;
            }
            None => self.reporter.warn(
                "No SSH key configured; the template will have no authorized key \
                 (set PROXMOX_SSH_KEY_PATH or pass --ssh-key)",
            ),
        }

        match self.hypervisor.cloudinit_dump(id, "user").await {
            Ok(output) if output.status.success() => {
                let body = String::from_utf8_lossy(&output.stdout);
                self.reporter.detail("cloud-init user-data", body.trim_end());
            }
            Ok(output) => tracing::debug!(
                template_id = id,
                code = ?output.status.code(),
                "cloud-init dump returned non-zero"
            ),
            Err(err) => tracing::debug!(template_id = id, error = %err, "cloud-init dump failed"),
        }
        Ok(())
    }

    fn cleanup(&self, plan: &TemplatePlan) {
        if plan.keep_image {
            self.reporter
                .info(&format!("Keeping image {}", plan.image_path.display()));
            return;
        }
        if let Err(err) = self.fs.remove_file(&plan.image_path) {
            self.reporter.warn(&format!(
                "Could not remove image {}: {err:#}",
                plan.image_path.display()
            ));
        }
    }
}
