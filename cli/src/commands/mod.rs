//! Command implementations

pub mod create_template;
pub mod create_vm;
pub mod delete;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;

use clap::Args;

use crate::domain::ValidationError;
use crate::domain::validate::{MAX_RESOURCE_ID, MIN_RESOURCE_ID, validate_resource_id};

/// A single VM id argument.
#[derive(Debug, Args)]
pub struct VmIdArg {
    /// VM ID
    pub vm_id: u64,
}

/// Narrow a command-line id to the hypervisor range.
pub(crate) fn resource_id(raw: u64) -> Result<u32, ValidationError> {
    validate_resource_id(raw, MIN_RESOURCE_ID, MAX_RESOURCE_ID)
}
