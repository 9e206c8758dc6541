//! Domain types and validators for ProxBox configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access. Layering of
//! the file, environment, and command-line sources happens in
//! `crate::infra::config`; this module only merges and validates.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

// ── Defaults and bounds ──────────────────────────────────────────────────────

pub const DEFAULT_DATA_STORE: &str = "local-lvm";
pub const DEFAULT_VM_BRIDGE: &str = "vmbr0";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://cloud-images.ubuntu.com";
pub const DEFAULT_TEMPLATE_MEMORY_MB: u32 = 2048;
pub const DEFAULT_TEMPLATE_DISK_INCREASE_GB: u32 = 30;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const TEMPLATE_MEMORY_MB_RANGE: RangeInclusive<u32> = 512..=65536;
const TEMPLATE_DISK_INCREASE_GB_RANGE: RangeInclusive<u32> = 0..=1000;
const DOWNLOAD_TIMEOUT_SECONDS_RANGE: RangeInclusive<u64> = 30..=3600;
const MAX_RETRIES_RANGE: RangeInclusive<u32> = 1..=10;

// ── Settings (unvalidated, layered) ──────────────────────────────────────────

/// One layer of settings: a YAML file, the environment, or CLI overrides.
///
/// Every field is optional; [`Settings::overlay`] lets a later layer replace
/// the fields it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_store: Option<String>,
    pub vm_bridge: Option<String>,
    pub ssh_key_path: Option<PathBuf>,
    pub template_memory_mb: Option<u32>,
    pub template_disk_increase_gb: Option<u32>,
    pub ubuntu_image_base_url: Option<String>,
    pub download_timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub image_dir: Option<PathBuf>,
}

impl Settings {
    /// Returns `self` with every field set in `top` replaced.
    #[must_use]
    pub fn overlay(self, top: Settings) -> Settings {
        Settings {
            data_store: top.data_store.or(self.data_store),
            vm_bridge: top.vm_bridge.or(self.vm_bridge),
            ssh_key_path: top.ssh_key_path.or(self.ssh_key_path),
            template_memory_mb: top.template_memory_mb.or(self.template_memory_mb),
            template_disk_increase_gb: top
                .template_disk_increase_gb
                .or(self.template_disk_increase_gb),
            ubuntu_image_base_url: top.ubuntu_image_base_url.or(self.ubuntu_image_base_url),
            download_timeout_seconds: top
                .download_timeout_seconds
                .or(self.download_timeout_seconds),
            max_retries: top.max_retries.or(self.max_retries),
            image_dir: top.image_dir.or(self.image_dir),
        }
    }
}

// ── Configuration (validated, immutable) ─────────────────────────────────────

/// Validated configuration, loaded once and passed by reference into every
/// workflow.
///
/// Only [`Configuration::from_settings`] builds one; fields are read through
/// accessors so a validated value cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    data_store: String,
    vm_bridge: String,
    ssh_key_path: Option<PathBuf>,
    template_memory_mb: u32,
    template_disk_increase_gb: u32,
    ubuntu_image_base_url: String,
    download_timeout_seconds: u64,
    max_retries: u32,
    image_dir: PathBuf,
}

impl Configuration {
    /// Validate merged settings, filling unset fields with defaults.
    ///
    /// `ssh_key_path` must already be resolved (see
    /// `crate::infra::config::resolve_ssh_key_path`).
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError::Config`] encountered; no partial
    /// configuration is ever produced.
    pub fn from_settings(
        settings: Settings,
        default_image_dir: PathBuf,
    ) -> Result<Self, ValidationError> {
        let data_store = non_empty(
            "data_store",
            settings
                .data_store
                .unwrap_or_else(|| DEFAULT_DATA_STORE.to_string()),
        )?;
        let vm_bridge = non_empty(
            "vm_bridge",
            settings
                .vm_bridge
                .unwrap_or_else(|| DEFAULT_VM_BRIDGE.to_string()),
        )?;
        let ubuntu_image_base_url = non_empty(
            "ubuntu_image_base_url",
            settings
                .ubuntu_image_base_url
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
        )?;

        let template_memory_mb = in_range(
            "template_memory_mb",
            settings
                .template_memory_mb
                .unwrap_or(DEFAULT_TEMPLATE_MEMORY_MB),
            &TEMPLATE_MEMORY_MB_RANGE,
        )?;
        let template_disk_increase_gb = in_range(
            "template_disk_increase_gb",
            settings
                .template_disk_increase_gb
                .unwrap_or(DEFAULT_TEMPLATE_DISK_INCREASE_GB),
            &TEMPLATE_DISK_INCREASE_GB_RANGE,
        )?;
        let download_timeout_seconds = in_range(
            "download_timeout_seconds",
            settings
                .download_timeout_seconds
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECONDS),
            &DOWNLOAD_TIMEOUT_SECONDS_RANGE,
        )?;
        let max_retries = in_range(
            "max_retries",
            settings.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            &MAX_RETRIES_RANGE,
        )?;

        Ok(Self {
            data_store,
            vm_bridge,
            ssh_key_path: settings.ssh_key_path,
            template_memory_mb,
            template_disk_increase_gb,
            ubuntu_image_base_url,
            download_timeout_seconds,
            max_retries,
            image_dir: settings.image_dir.unwrap_or(default_image_dir),
        })
    }

    pub fn data_store(&self) -> &str {
        &self.data_store
    }

    pub fn vm_bridge(&self) -> &str {
        &self.vm_bridge
    }

    /// Absolute path to an existing SSH public key, if configured.
    pub fn ssh_key_path(&self) -> Option<&Path> {
        self.ssh_key_path.as_deref()
    }

    pub fn template_memory_mb(&self) -> u32 {
        self.template_memory_mb
    }

    pub fn template_disk_increase_gb(&self) -> u32 {
        self.template_disk_increase_gb
    }

    pub fn ubuntu_image_base_url(&self) -> &str {
        &self.ubuntu_image_base_url
    }

    pub fn download_timeout_seconds(&self) -> u64 {
        self.download_timeout_seconds
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Directory holding cached cloud images.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a template memory override against the configuration bounds.
///
/// # Errors
///
/// Returns an error if `mb` is outside 512..=65536.
pub fn validate_memory_mb(mb: u32) -> Result<u32, ValidationError> {
    in_range("memory", mb, &TEMPLATE_MEMORY_MB_RANGE)
}

/// Validates a disk increase override against the configuration bounds.
///
/// # Errors
///
/// Returns an error if `gb` is above 1000.
pub fn validate_disk_increase_gb(gb: u32) -> Result<u32, ValidationError> {
    in_range("disk_increase", gb, &TEMPLATE_DISK_INCREASE_GB_RANGE)
}

fn non_empty(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Config {
            field,
            reason: "value cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn in_range<T>(
    field: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<T, ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        return Err(ValidationError::Config {
            field,
            reason: format!(
                "must be between {} and {}, got {value}",
                range.start(),
                range.end()
            ),
        });
    }
    Ok(value)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
