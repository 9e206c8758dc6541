//! Workflow commands that fail on configuration or input before reaching `qm`.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::proxbox;

const PROXMOX_VARS: [&str; 10] = [
    "PROXMOX_CONFIG",
    "PROXMOX_DATA_STORE",
    "PROXMOX_VM_BRIDGE",
    "PROXMOX_SSH_KEY_PATH",
    "PROXMOX_TEMPLATE_MEMORY_MB",
    "PROXMOX_TEMPLATE_DISK_INCREASE_GB",
    "PROXMOX_UBUNTU_IMAGE_BASE_URL",
    "PROXMOX_DOWNLOAD_TIMEOUT_SECONDS",
    "PROXMOX_MAX_RETRIES",
    "PROXMOX_IMAGE_DIR",
];

/// An empty settings file in its own directory.
fn empty_settings() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "").expect("write settings");
    (dir, path)
}

fn isolated() -> assert_cmd::Command {
    let mut cmd = proxbox();
    for var in PROXMOX_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn same_template_and_vm_id_is_rejected() {
    let (_dir, settings) = empty_settings();
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-vm", "9000", "9000", "web"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be the same"));
}

#[test]
fn name_without_valid_characters_is_rejected() {
    let (_dir, settings) = empty_settings();
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-vm", "9000", "101", ";;;"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no valid characters"));
}

#[test]
fn non_numeric_env_setting_is_rejected() {
    let (_dir, settings) = empty_settings();
    isolated()
        .env("PROXMOX_MAX_RETRIES", "lots")
        .arg("--config")
        .arg(&settings)
        .args(["create-template", "jammy", "9000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PROXMOX_MAX_RETRIES"));
}

#[test]
fn missing_ssh_key_is_rejected() {
    let (dir, settings) = empty_settings();
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-template", "jammy", "9000", "--ssh-key"])
        .arg(dir.path().join("absent.pub"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SSH key not found"));
}

#[test]
fn malformed_settings_file_is_rejected() {
    let (_dir, settings) = empty_settings();
    std::fs::write(&settings, "max_retries: [1, 2]\n").expect("write settings");
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-template", "noble", "9000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("settings file"));
}

#[test]
fn reserved_template_id_is_rejected() {
    let (_dir, settings) = empty_settings();
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-template", "jammy", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("VM ID must be between"));
}

#[test]
fn template_name_with_disallowed_characters_is_rejected() {
    let (_dir, settings) = empty_settings();
    isolated()
        .arg("--config")
        .arg(&settings)
        .args(["create-template", "jammy", "9000", "--name", "golden image!"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid template name"));
}
