//! Application context: unified state passed to every command handler.
//!
//! Adding a new cross-cutting concern requires only one field change here;
//! command signatures stay the same.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ConfigProvider;
use crate::domain::{Configuration, Settings};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::LayeredConfigProvider;
use crate::infra::downloader::HttpDownloader;
use crate::infra::qm::QmProvisioner;
use crate::output::OutputContext;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    /// Settings file given with `--config`.
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    pub json: bool,
    /// `qm` adapter used by every workflow.
    pub hypervisor: QmProvisioner<TokioCommandRunner>,
    /// When `true`, confirmation prompts are answered "yes" without asking.
    ///
    /// Set when the `CI` or `PROXBOX_YES` environment variables are present.
    pub non_interactive: bool,
    config_path: Option<PathBuf>,
}

impl AppContext {
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let non_interactive =
            std::env::var_os("CI").is_some() || std::env::var_os("PROXBOX_YES").is_some();

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            json: flags.output.json,
            hypervisor: QmProvisioner::default_runner(),
            non_interactive,
            config_path: flags.config.clone(),
        }
    }

    /// Load the layered configuration with `overrides` applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or any field is
    /// invalid.
    pub fn load_config(&self, overrides: Settings) -> Result<Configuration> {
        let provider =
            LayeredConfigProvider::new(self.config_path.clone()).with_overrides(overrides);
        if let Some(path) = provider.settings_path() {
            tracing::debug!(path = %path.display(), "settings file");
        }
        provider.load()
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn downloader(&self) -> Result<HttpDownloader> {
        HttpDownloader::new(self.output.show_progress())
    }

    /// Ask the user for confirmation. Defaults to "no".
    ///
    /// When `non_interactive` is `true`, returns `true` without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}
