//! Identifier and name validation.
//!
//! Pure functions only. The sanitised name ends up as a single argv element
//! of a `qm` invocation, so stripping must be complete and deterministic.

use crate::domain::error::ValidationError;

/// Lowest id accepted by default; the hypervisor reserves ids below 100.
pub const MIN_RESOURCE_ID: u32 = 100;
/// Highest id the hypervisor accepts.
pub const MAX_RESOURCE_ID: u32 = 999_999_999;
/// Maximum length of a sanitised VM name.
pub const MAX_NAME_LEN: usize = 64;

/// Validates a VM or template id against `[min_id, max_id]`.
///
/// # Errors
///
/// Returns [`ValidationError::IdOutOfRange`] if `id` is outside the range.
pub fn validate_resource_id(id: u64, min_id: u32, max_id: u32) -> Result<u32, ValidationError> {
    let out_of_range = || ValidationError::IdOutOfRange {
        id,
        min: u64::from(min_id),
        max: u64::from(max_id),
    };
    if id < u64::from(min_id) || id > u64::from(max_id) {
        return Err(out_of_range());
    }
    u32::try_from(id).map_err(|_| out_of_range())
}

/// Validates an id with the default bounds.
///
/// # Errors
///
/// See [`validate_resource_id`].
pub fn validate_default_id(id: u32) -> Result<u32, ValidationError> {
    validate_resource_id(u64::from(id), MIN_RESOURCE_ID, MAX_RESOURCE_ID)
}

/// Strips every character outside `[A-Za-z0-9_-]`.
///
/// # Errors
///
/// Returns an error if the input is blank, if nothing survives stripping,
/// or if the result is longer than [`MAX_NAME_LEN`].
pub fn sanitize_name(raw: &str) -> Result<String, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let sanitized: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if sanitized.is_empty() {
        return Err(ValidationError::NoValidCharacters(raw.to_string()));
    }
    if sanitized.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            name: sanitized,
            max: MAX_NAME_LEN,
        });
    }
    Ok(sanitized)
}

/// Accepts `raw` only when [`sanitize_name`] would leave it unchanged.
///
/// # Errors
///
/// Returns the [`sanitize_name`] error, or
/// [`ValidationError::DisallowedCharacters`] if any character would be stripped.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let clean = sanitize_name(raw)?;
    if clean != raw {
        return Err(ValidationError::DisallowedCharacters(raw.to_string()));
    }
    Ok(clean)
}
