//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Validation errors ─────────────────────────────────────────────────────────

/// Bad input. Raised before anything is sent to the hypervisor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("VM ID must be between {min} and {max}, got {id}")]
    IdOutOfRange { id: u64, min: u64, max: u64 },

    #[error("Template ID and VM ID cannot be the same: {0}")]
    SameIds(u64),

    #[error("VM name cannot be empty")]
    EmptyName,

    #[error(
        "VM name '{0}' contains no valid characters (only alphanumeric, hyphens, and underscores allowed)"
    )]
    NoValidCharacters(String),

    #[error("VM name too long (max {max} characters): {name}")]
    NameTooLong { name: String, max: usize },

    #[error("name '{0}' contains characters outside [A-Za-z0-9_-]")]
    DisallowedCharacters(String),

    #[error("Invalid VM name: {0}")]
    InvalidName(Box<ValidationError>),

    #[error("Invalid template name: {0}")]
    InvalidTemplateName(Box<ValidationError>),

    #[error("Invalid configuration for {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("Unsupported checksum algorithm '{0}' (expected sha224, sha256, sha384, or sha512)")]
    UnsupportedAlgorithm(String),
}

// ── Network errors ────────────────────────────────────────────────────────────

/// Download failure. The only error kind the download retry policy retries.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to download {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },
}

// ── Command errors ────────────────────────────────────────────────────────────

/// Exit code reported when a command was killed by its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// An external command exited non-zero or timed out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Command '{command}' failed with exit code {exit_code}: {stderr}")]
pub struct CommandError {
    /// Space-joined command line.
    pub command: String,
    pub exit_code: i32,
    pub stderr: String,
}

impl CommandError {
    #[must_use]
    pub fn timed_out(command: String, timeout_secs: u64) -> Self {
        Self {
            command,
            exit_code: TIMEOUT_EXIT_CODE,
            stderr: format!("Command timed out after {timeout_secs} seconds"),
        }
    }
}

// ── Checksum errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error(
    "Checksum mismatch for {}\n  Algorithm: {algorithm}\n  Expected:  {expected}\n  Actual:    {actual}",
    path.display()
)]
pub struct ChecksumMismatch {
    pub path: PathBuf,
    pub algorithm: String,
    pub expected: String,
    pub actual: String,
}

// ── Workflow errors ───────────────────────────────────────────────────────────

/// A template workflow step failed. Earlier steps are not rolled back.
#[derive(Debug, Error)]
#[error("Failed to create template {template_id} (step: {step})")]
pub struct TemplateCreationError {
    pub template_id: u32,
    pub step: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// A VM creation step failed. Earlier steps are not rolled back.
#[derive(Debug, Error)]
#[error("Failed to create VM {vm_id} from template {template_id} (step: {step})")]
pub struct VmCreationError {
    pub vm_id: u32,
    pub template_id: u32,
    pub step: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// Returns `true` if any error in the chain is one of the expected,
/// user-facing kinds above.
///
/// Used by `main` to choose between exit code 1 (expected failure) and
/// 2 (unexpected failure).
#[must_use]
pub fn is_expected(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.is::<ValidationError>()
            || cause.is::<NetworkError>()
            || cause.is::<CommandError>()
            || cause.is::<ChecksumMismatch>()
            || cause.is::<TemplateCreationError>()
            || cause.is::<VmCreationError>()
    })
}
