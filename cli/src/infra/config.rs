//! Infrastructure implementation of the `ConfigProvider` port.
//!
//! Layers, later wins: built-in defaults, the YAML settings file, `PROXMOX_*`
//! environment variables, then per-command overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigProvider;
use crate::domain::{Configuration, Settings, ValidationError};
use crate::infra::fs::default_image_dir;

/// Environment variable naming an alternative settings file.
pub const CONFIG_ENV: &str = "PROXMOX_CONFIG";

const ENV_DATA_STORE: &str = "PROXMOX_DATA_STORE";
const ENV_VM_BRIDGE: &str = "PROXMOX_VM_BRIDGE";
const ENV_SSH_KEY_PATH: &str = "PROXMOX_SSH_KEY_PATH";
const ENV_TEMPLATE_MEMORY_MB: &str = "PROXMOX_TEMPLATE_MEMORY_MB";
const ENV_TEMPLATE_DISK_INCREASE_GB: &str = "PROXMOX_TEMPLATE_DISK_INCREASE_GB";
const ENV_UBUNTU_IMAGE_BASE_URL: &str = "PROXMOX_UBUNTU_IMAGE_BASE_URL";
const ENV_DOWNLOAD_TIMEOUT_SECONDS: &str = "PROXMOX_DOWNLOAD_TIMEOUT_SECONDS";
const ENV_MAX_RETRIES: &str = "PROXMOX_MAX_RETRIES";
const ENV_IMAGE_DIR: &str = "PROXMOX_IMAGE_DIR";

/// Loads configuration from file, environment, and overrides.
pub struct LayeredConfigProvider {
    /// `--config`, if given.
    explicit_path: Option<PathBuf>,
    overrides: Settings,
}

impl LayeredConfigProvider {
    #[must_use]
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            overrides: Settings::default(),
        }
    }

    /// Settings that win over every other layer.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Settings) -> Self {
        self.overrides = overrides;
        self
    }

    /// Path named by `--config` or `$PROXMOX_CONFIG`. Such a file must exist.
    fn required_path(&self) -> Option<PathBuf> {
        self.explicit_path
            .clone()
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    fn file_settings(&self) -> Result<Settings> {
        if let Some(path) = self.required_path() {
            return read_settings(&path);
        }
        match default_settings_path() {
            Some(path) if path.is_file() => read_settings(&path),
            _ => Ok(Settings::default()),
        }
    }
}

impl ConfigProvider for LayeredConfigProvider {
    fn load(&self) -> Result<Configuration> {
        let file = self.file_settings()?;
        let env = settings_from_env(|key| std::env::var(key).ok())?;
        let merged = file.overlay(env).overlay(self.overrides.clone());
        build_configuration(merged)
    }

    fn settings_path(&self) -> Option<PathBuf> {
        self.required_path().or_else(default_settings_path)
    }
}

/// `~/.proxbox/config.yaml`.
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".proxbox").join("config.yaml"))
}

/// Parse one YAML settings file. Unknown keys are ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or a
/// `ValidationError::Config` if it is not valid settings YAML.
pub fn read_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read settings file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings = serde_yaml::from_str(&content).map_err(|e| ValidationError::Config {
        field: "settings file",
        reason: format!("{}: {e}", path.display()),
    })?;
    Ok(settings)
}

/// Read the `PROXMOX_*` variables through `lookup`. Empty values count as unset.
///
/// # Errors
///
/// Returns a `ValidationError::Config` if a numeric variable does not parse.
pub fn settings_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ValidationError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    Ok(Settings {
        data_store: get(ENV_DATA_STORE),
        vm_bridge: get(ENV_VM_BRIDGE),
        ssh_key_path: get(ENV_SSH_KEY_PATH).map(PathBuf::from),
        template_memory_mb: parse_num(ENV_TEMPLATE_MEMORY_MB, get(ENV_TEMPLATE_MEMORY_MB))?,
        template_disk_increase_gb: parse_num(
            ENV_TEMPLATE_DISK_INCREASE_GB,
            get(ENV_TEMPLATE_DISK_INCREASE_GB),
        )?,
        ubuntu_image_base_url: get(ENV_UBUNTU_IMAGE_BASE_URL),
        download_timeout_seconds: parse_num(
            ENV_DOWNLOAD_TIMEOUT_SECONDS,
            get(ENV_DOWNLOAD_TIMEOUT_SECONDS),
        )?,
        max_retries: parse_num(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES))?,
        image_dir: get(ENV_IMAGE_DIR).map(PathBuf::from),
    })
}

fn parse_num<T: std::str::FromStr>(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ValidationError> {
    raw.map(|v| {
        v.trim().parse().map_err(|_| ValidationError::Config {
            field,
            reason: format!("expected a non-negative integer, got '{v}'"),
        })
    })
    .transpose()
}

/// Resolve the SSH key path, then validate the merged settings.
///
/// # Errors
///
/// Returns a `ValidationError` for the first invalid field.
pub fn build_configuration(mut settings: Settings) -> Result<Configuration> {
    settings.ssh_key_path = settings
        .ssh_key_path
        .as_deref()
        .map(resolve_ssh_key_path)
        .transpose()?;
    let config = Configuration::from_settings(settings, default_image_dir())?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Expand `~`, canonicalise, and require an existing regular file.
///
/// # Errors
///
/// Returns a `ValidationError::Config` if the key does not exist or is not a
/// file.
pub fn resolve_ssh_key_path(raw: &Path) -> Result<PathBuf, ValidationError> {
    let expanded = expand_tilde(raw);
    let invalid = |reason: String| ValidationError::Config {
        field: "ssh_key_path",
        reason,
    };
    let resolved = expanded
        .canonicalize()
        .map_err(|_| invalid(format!("SSH key not found: {}", expanded.display())))?;
    if !resolved.is_file() {
        return Err(invalid(format!(
            "SSH key path is not a file: {}",
            resolved.display()
        )));
    }
    Ok(resolved)
}

/// Replace a leading `~` with the home directory.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
