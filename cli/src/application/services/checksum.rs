//! Checksum verification of local artifacts.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::FileHasher;
use crate::domain::checksum::{ChecksumAlgorithm, digest_matches};

/// Verify that `path` hashes to `expected_hex` under `algorithm`.
///
/// A mismatch is not an error: it returns `Ok(false)` and the caller decides
/// what to do.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn verify_checksum(
    hasher: &impl FileHasher,
    path: &Path,
    expected_hex: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<bool> {
    verify_with(hasher, path, expected_hex, algorithm).map(|(matches, _)| matches)
}

/// Like [`verify_checksum`], also returning the actual digest.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn verify_with(
    hasher: &impl FileHasher,
    path: &Path,
    expected_hex: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<(bool, String)> {
    let actual = hasher
        .digest_file(path, algorithm)
        .with_context(|| format!("computing {algorithm} of {}", path.display()))?;
    let matches = digest_matches(&actual, expected_hex);
    if matches {
        tracing::info!(path = %path.display(), %algorithm, "checksum verified");
    } else {
        tracing::warn!(
            path = %path.display(),
            %algorithm,
            expected = expected_hex.trim(),
            actual = %actual,
            "checksum mismatch"
        );
    }
    Ok((matches, actual))
}
