//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod checksum;
pub mod config;
pub mod error;
pub mod release;
pub mod status;
pub mod validate;
pub mod workflow;

pub use checksum::{ChecksumAlgorithm, ExpectedChecksum};
pub use config::{Configuration, Settings};
pub use error::{
    ChecksumMismatch, CommandError, NetworkError, TemplateCreationError, ValidationError,
    VmCreationError,
};
pub use release::Release;
pub use status::VmStatus;
pub use validate::{sanitize_name, validate_resource_id};
pub use workflow::{TemplatePlan, TemplateRequest, VmPlan, VmRequest, WorkflowRun};
