//! Template workflow driven through the real `qm` adapter.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use proxbox_cli::application::RetryPolicy;
use proxbox_cli::application::services::template::TemplateWorkflow;
use proxbox_cli::domain::workflow::template_steps;
use proxbox_cli::domain::{
    ChecksumAlgorithm, ChecksumMismatch, CommandError, Configuration, ExpectedChecksum, Release,
    Settings, TemplateCreationError, TemplateRequest, ValidationError,
};
use proxbox_cli::infra::command_runner::IMPORT_TIMEOUT;
use proxbox_cli::infra::fs::{LocalFs, digest_file};
use tempfile::TempDir;

use crate::helpers::{
    BrokenDownloader, QuietReporter, RecordingRunner, ScriptedDownloader, recording_qm,
};

fn config(dir: &TempDir) -> Configuration {
    Configuration::from_settings(
        Settings {
            image_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        },
        PathBuf::from("/unused"),
    )
    .expect("defaults are valid")
}

fn image_path(dir: &TempDir, release: Release) -> PathBuf {
    dir.path().join(release.image_filename())
}

#[tokio::test]
async fn import_failure_stops_after_import() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::failing_on("qm importdisk"));
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    let err = TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest::new(Release::Jammy, 9000))
        .await
        .unwrap_err();

    let wrapped = err
        .downcast_ref::<TemplateCreationError>()
        .expect("TemplateCreationError");
    assert_eq!(wrapped.template_id, 9000);
    assert_eq!(wrapped.step, template_steps::IMPORT_DISK);
    assert!(err.chain().any(|c| c.is::<CommandError>()));

    let calls = qm.runner().calls();
    assert_eq!(calls.len(), 2, "got: {calls:?}");
    assert!(calls[0].starts_with("qm create 9000"));
    assert!(calls[1].starts_with("qm importdisk 9000"));
    // Nothing is rolled back.
    assert!(!calls.iter().any(|c| c.starts_with("qm destroy")));
}

#[tokio::test]
async fn full_run_issues_exact_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let key = dir.path().join("id_ed25519.pub");
    std::fs::write(&key, "ssh-ed25519 AAAA test").expect("key");
    let cfg = Configuration::from_settings(
        Settings {
            data_store: Some("ceph-pool".to_string()),
            vm_bridge: Some("vmbr2".to_string()),
            ssh_key_path: Some(key.clone()),
            image_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        },
        PathBuf::from("/unused"),
    )
    .expect("valid settings");

    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();
    let image = image_path(&dir, Release::Noble);

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            name: Some("golden-image".to_string()),
            ..TemplateRequest::new(Release::Noble, 9100)
        })
        .await
        .expect("template created");

    assert_eq!(
        qm.runner().calls(),
        vec![
            "qm create 9100 --name golden-image --memory 2048 --net0 virtio,bridge=vmbr2".to_string(),
            format!("qm importdisk 9100 {} ceph-pool -format qcow2", image.display()),
            "qm set 9100 --scsihw virtio-scsi-pci --scsi0 ceph-pool:vm-9100-disk-0".to_string(),
            "qm set 9100 --ide2 ceph-pool:cloudinit --boot c --bootdisk scsi0 --serial0 socket --vga serial0".to_string(),
            "qm resize 9100 scsi0 +30G".to_string(),
            "qm set 9100 --ipconfig0 ip=dhcp".to_string(),
            format!("qm set 9100 --sshkey {}", key.display()),
            "qm cloudinit dump 9100 user".to_string(),
            "qm template 9100".to_string(),
        ]
    );
    assert_eq!(qm.runner().timeouts.borrow()[1], Some(IMPORT_TIMEOUT));
    assert!(!image.exists(), "image is removed after a successful run");
    assert!(reporter.warnings.borrow().is_empty());
}

#[tokio::test]
async fn cached_image_is_reused_without_download() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    std::fs::write(image_path(&dir, Release::Focal), b"cached").expect("seed cache");
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            keep_image: true,
            ..TemplateRequest::new(Release::Focal, 9000)
        })
        .await
        .expect("template created");

    assert_eq!(dl.calls.get(), 0);
    assert!(image_path(&dir, Release::Focal).exists());
}

#[tokio::test]
async fn download_retried_until_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::failing(2);
    let reporter = QuietReporter::default();

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .with_retry(RetryPolicy::exponential(3).without_delay())
        .create_template(&TemplateRequest::new(Release::Jammy, 9000))
        .await
        .expect("third attempt succeeds");

    assert_eq!(dl.calls.get(), 3);
    assert!(qm.runner().calls().iter().any(|c| c == "qm template 9000"));
}

#[tokio::test]
async fn non_network_download_error_is_not_retried() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = BrokenDownloader::default();
    let reporter = QuietReporter::default();

    let err = TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .with_retry(RetryPolicy::exponential(5).without_delay())
        .create_template(&TemplateRequest::new(Release::Jammy, 9000))
        .await
        .unwrap_err();

    assert_eq!(dl.calls.get(), 1);
    let wrapped = err.downcast_ref::<TemplateCreationError>().expect("wrapped");
    assert_eq!(wrapped.step, template_steps::ENSURE_IMAGE);
    assert!(qm.runner().calls().is_empty());
}

#[tokio::test]
async fn zero_disk_increase_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            disk_increase_gb: Some(0),
            ..TemplateRequest::new(Release::Jammy, 9000)
        })
        .await
        .expect("template created");

    assert!(!qm.runner().calls().iter().any(|c| c.starts_with("qm resize")));
}

#[tokio::test]
async fn missing_ssh_key_warns_and_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest::new(Release::Jammy, 9000))
        .await
        .expect("template created");

    assert!(!qm.runner().calls().iter().any(|c| c.contains("--sshkey")));
    assert_eq!(reporter.warnings.borrow().len(), 1);
}

#[tokio::test]
async fn reserved_template_id_never_reaches_qm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    let err = TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest::new(Release::Jammy, 50))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::IdOutOfRange { id: 50, .. })
    ));
    assert!(qm.runner().calls().is_empty());
    assert_eq!(dl.calls.get(), 0);
}

#[tokio::test]
async fn template_name_needing_rewrite_never_reaches_qm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    let err = TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            name: Some("golden image!".to_string()),
            ..TemplateRequest::new(Release::Jammy, 9000)
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::InvalidTemplateName(_))
    ));
    assert!(qm.runner().calls().is_empty());
    assert_eq!(dl.calls.get(), 0);
}

#[tokio::test]
async fn checksum_mismatch_after_download_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();

    let err = TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            checksum: Some(ExpectedChecksum {
                algorithm: ChecksumAlgorithm::Sha256,
                hex: "00".repeat(32),
            }),
            ..TemplateRequest::new(Release::Jammy, 9000)
        })
        .await
        .unwrap_err();

    assert!(err.chain().any(|c| c.is::<ChecksumMismatch>()));
    assert!(qm.runner().calls().is_empty());
}

#[tokio::test]
async fn stale_cached_image_is_replaced() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let image = image_path(&dir, Release::Jammy);
    std::fs::write(&image, b"truncated").expect("seed cache");
    let qm = recording_qm(RecordingRunner::new());
    let dl = ScriptedDownloader::ok();
    let reporter = QuietReporter::default();
    let reference = dir.path().join("reference");
    std::fs::write(&reference, dl.body).expect("reference");
    let expected = digest_file(&reference, ChecksumAlgorithm::Sha256).expect("digest");

    TemplateWorkflow::new(&qm, &dl, &LocalFs, &LocalFs, &reporter, &cfg)
        .create_template(&TemplateRequest {
            keep_image: true,
            checksum: Some(ExpectedChecksum {
                algorithm: ChecksumAlgorithm::Sha256,
                hex: expected.to_uppercase(),
            }),
            ..TemplateRequest::new(Release::Jammy, 9000)
        })
        .await
        .expect("template created");

    assert_eq!(dl.calls.get(), 1);
    assert_eq!(std::fs::read(&image).expect("read"), dl.body);
    assert_eq!(reporter.warnings.borrow().len(), 2, "stale cache and missing SSH key");
}
