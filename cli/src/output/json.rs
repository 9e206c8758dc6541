//! JSON output helpers for `--json` code paths.

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-print any serialisable value.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Format a JSON error object.
///
/// ```json
/// { "error": true, "message": "...", "code": 1 }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: i32) -> Result<String> {
    to_pretty(&serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    }))
}
