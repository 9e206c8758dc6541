//! Workflow run records and resolved plans.
//!
//! A run lives for exactly one `create_template` / `create_vm` call. It is
//! never persisted.

use std::path::PathBuf;

use crate::domain::checksum::ExpectedChecksum;
use crate::domain::config::{Configuration, validate_disk_increase_gb, validate_memory_mb};
use crate::domain::error::ValidationError;
use crate::domain::release::Release;
use crate::domain::validate::{sanitize_name, validate_default_id, validate_name};

/// Step names of the template workflow, in execution order.
pub mod template_steps {
    pub const RESOLVE_IMAGE: &str = "resolve image";
    pub const ENSURE_IMAGE: &str = "ensure image";
    pub const CREATE_VM: &str = "create vm";
    pub const IMPORT_DISK: &str = "import disk";
    pub const CONFIGURE_HARDWARE: &str = "configure hardware";
    pub const RESIZE_DISK: &str = "resize disk";
    pub const CONFIGURE_CLOUD_INIT: &str = "configure cloud-init";
    pub const CONVERT_TO_TEMPLATE: &str = "convert to template";
    pub const CLEANUP: &str = "cleanup";
}

/// Step names of the VM workflow, in execution order.
pub mod vm_steps {
    pub const CLONE: &str = "clone";
    pub const CONFIGURE_HARDWARE: &str = "configure hardware";
    pub const CONFIGURE_NETWORK: &str = "configure network";
    pub const START: &str = "start";
}

/// Ordered record of the steps a workflow has entered and finished.
#[derive(Debug, Default)]
pub struct WorkflowRun {
    completed: Vec<&'static str>,
    current: Option<&'static str>,
}

impl WorkflowRun {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `step` as in progress. Finishes the previous step if one is open.
    pub fn begin(&mut self, step: &'static str) {
        self.finish();
        self.current = Some(step);
    }

    /// Mark the open step, if any, as completed.
    pub fn finish(&mut self) {
        if let Some(step) = self.current.take() {
            self.completed.push(step);
        }
    }

    /// The step that is in progress, i.e. the one to blame for a failure.
    #[must_use]
    pub fn current(&self) -> Option<&'static str> {
        self.current
    }

    #[must_use]
    pub fn completed(&self) -> &[&'static str] {
        &self.completed
    }
}

// ── Template plan ────────────────────────────────────────────────────────────

/// Caller-supplied template parameters; unset fields fall back to configuration.
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    pub release: Release,
    pub template_id: u32,
    pub name: Option<String>,
    pub memory_mb: Option<u32>,
    pub disk_increase_gb: Option<u32>,
    pub keep_image: bool,
    pub checksum: Option<ExpectedChecksum>,
}

impl TemplateRequest {
    #[must_use]
    pub fn new(release: Release, template_id: u32) -> Self {
        Self {
            release,
            template_id,
            name: None,
            memory_mb: None,
            disk_increase_gb: None,
            keep_image: false,
            checksum: None,
        }
    }
}

/// Fully resolved template parameters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePlan {
    pub release: Release,
    pub template_id: u32,
    pub name: String,
    pub memory_mb: u32,
    pub disk_increase_gb: u32,
    pub image_url: String,
    /// Cache path, keyed only by release so re-runs reuse the download.
    pub image_path: PathBuf,
    pub keep_image: bool,
    pub checksum: Option<ExpectedChecksum>,
}

impl TemplatePlan {
    /// Validate the request and apply configuration defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an out-of-range id, a name that is
    /// not already made of `[A-Za-z0-9_-]` (template names are never
    /// rewritten), or out-of-range memory/disk overrides.
    pub fn resolve(req: &TemplateRequest, config: &Configuration) -> Result<Self, ValidationError> {
        let template_id = validate_default_id(req.template_id)?;
        let name = match &req.name {
            Some(raw) => {
                validate_name(raw).map_err(|e| ValidationError::InvalidTemplateName(Box::new(e)))?
            }
            None => req.release.default_template_name(),
        };
        let memory_mb = match req.memory_mb {
            Some(mb) => validate_memory_mb(mb)?,
            None => config.template_memory_mb(),
        };
        let disk_increase_gb = match req.disk_increase_gb {
            Some(gb) => validate_disk_increase_gb(gb)?,
            None => config.template_disk_increase_gb(),
        };

        Ok(Self {
            release: req.release,
            template_id,
            name,
            memory_mb,
            disk_increase_gb,
            image_url: req.release.image_url(config.ubuntu_image_base_url()),
            image_path: config.image_dir().join(req.release.image_filename()),
            keep_image: req.keep_image,
            checksum: req.checksum.clone(),
        })
    }
}

// ── VM plan ──────────────────────────────────────────────────────────────────

/// Caller-supplied clone parameters.
#[derive(Debug, Clone)]
pub struct VmRequest {
    pub template_id: u32,
    pub vm_id: u32,
    pub name: String,
    pub start: bool,
    pub configure_network: bool,
}

impl VmRequest {
    #[must_use]
    pub fn new(template_id: u32, vm_id: u32, name: impl Into<String>) -> Self {
        Self {
            template_id,
            vm_id,
            name: name.into(),
            start: false,
            configure_network: true,
        }
    }
}

/// Validated clone parameters with a sanitised name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmPlan {
    pub template_id: u32,
    pub vm_id: u32,
    pub name: String,
    pub start: bool,
    pub configure_network: bool,
}

impl VmPlan {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if either id is out of range, the ids are
    /// equal, or the name cannot be sanitised.
    pub fn resolve(req: &VmRequest) -> Result<Self, ValidationError> {
        let template_id = validate_default_id(req.template_id)?;
        let vm_id = validate_default_id(req.vm_id)?;
        if template_id == vm_id {
            return Err(ValidationError::SameIds(u64::from(template_id)));
        }
        let name =
            sanitize_name(&req.name).map_err(|e| ValidationError::InvalidName(Box::new(e)))?;
        Ok(Self {
            template_id,
            vm_id,
            name,
            start: req.start,
            configure_network: req.configure_network,
        })
    }
}
