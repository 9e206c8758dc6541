//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod retry;
pub mod services;

pub use ports::{
    CommandRunner, ConfigProvider, CreateSpec, DiskManager, Downloader, FileHasher, Hypervisor,
    LocalFs, ProgressReporter, QM_BINARY, VmConfigurator, VmInspector, VmLifecycle,
};
pub use retry::{RetryPolicy, is_network_error};
