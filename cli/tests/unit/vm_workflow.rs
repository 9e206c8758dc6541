//! VM workflow and lifecycle operations driven through the real `qm` adapter.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use proxbox_cli::application::services::vm::{
    create_vm, delete_vm, get_vm_status, start_vm, stop_vm,
};
use proxbox_cli::domain::workflow::vm_steps;
use proxbox_cli::domain::{
    CommandError, Configuration, Settings, ValidationError, VmCreationError, VmRequest,
};

use crate::helpers::{QuietReporter, RecordingRunner, recording_qm};

fn config() -> Configuration {
    Configuration::from_settings(Settings::default(), PathBuf::from("/unused"))
        .expect("defaults are valid")
}

#[tokio::test]
async fn clone_configures_and_starts() {
    let qm = recording_qm(RecordingRunner::new());
    let reporter = QuietReporter::default();
    let req = VmRequest {
        start: true,
        ..VmRequest::new(9000, 101, "web-01")
    };

    create_vm(&qm, &reporter, &config(), &req)
        .await
        .expect("vm created");

    assert_eq!(
        qm.runner().calls(),
        vec![
            "qm clone 9000 101 --name web-01",
            "qm set 101 --ide2 local-lvm:cloudinit --boot c --bootdisk scsi0 --serial0 socket --vga serial0",
            "qm set 101 --ipconfig0 ip=dhcp",
            "qm start 101",
        ]
    );
}

#[tokio::test]
async fn clone_failure_names_both_ids() {
    let qm = recording_qm(RecordingRunner::failing_on("qm clone"));
    let reporter = QuietReporter::default();

    let err = create_vm(&qm, &reporter, &config(), &VmRequest::new(9000, 101, "web"))
        .await
        .unwrap_err();

    let wrapped = err.downcast_ref::<VmCreationError>().expect("wrapped");
    assert_eq!((wrapped.template_id, wrapped.vm_id), (9000, 101));
    assert_eq!(wrapped.step, vm_steps::CLONE);
    let rendered = format!("{err:#}");
    assert!(rendered.contains("qm clone 9000 101"), "got: {rendered}");
    assert_eq!(qm.runner().calls().len(), 1);
}

#[tokio::test]
async fn same_ids_never_reach_qm() {
    let qm = recording_qm(RecordingRunner::new());
    let reporter = QuietReporter::default();

    let err = create_vm(&qm, &reporter, &config(), &VmRequest::new(9000, 9000, "web"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cannot be the same"));
    assert!(qm.runner().calls().is_empty());
}

#[tokio::test]
async fn unusable_name_never_reaches_qm() {
    let qm = recording_qm(RecordingRunner::new());
    let reporter = QuietReporter::default();

    let err = create_vm(&qm, &reporter, &config(), &VmRequest::new(9000, 101, ";;;"))
        .await
        .unwrap_err();

    assert!(err.downcast_ref::<ValidationError>().is_some());
    assert!(qm.runner().calls().is_empty());
}

#[tokio::test]
async fn force_stop_skips_lock() {
    let qm = recording_qm(RecordingRunner::new());
    let reporter = QuietReporter::default();

    stop_vm(&qm, &reporter, 101, false).await.expect("stop");
    stop_vm(&qm, &reporter, 101, true).await.expect("force stop");

    assert_eq!(qm.runner().calls(), vec!["qm stop 101", "qm stop 101 --skiplock"]);
}

#[tokio::test]
async fn delete_purges_unless_told_not_to() {
    let qm = recording_qm(RecordingRunner::new());
    let reporter = QuietReporter::default();

    delete_vm(&qm, &reporter, 101, true).await.expect("delete");
    delete_vm(&qm, &reporter, 102, false).await.expect("delete");

    assert_eq!(
        qm.runner().calls(),
        vec!["qm destroy 101 --purge", "qm destroy 102"]
    );
}

#[tokio::test]
async fn start_failure_is_a_command_error() {
    let qm = recording_qm(RecordingRunner::failing_on("qm start"));
    let reporter = QuietReporter::default();

    let err = start_vm(&qm, &reporter, 101).await.unwrap_err();

    let cmd = err.downcast_ref::<CommandError>().expect("command error");
    assert_eq!(cmd.command, "qm start 101");
    assert_eq!(cmd.exit_code, 1);
    assert_eq!(cmd.stderr, "command failed");
}

#[tokio::test]
async fn status_output_is_parsed() {
    let qm = recording_qm(RecordingRunner::with_stdout(
        "status: running\nname: web-01\nmalformed line\nqmpstatus: running\n",
    ));

    let status = get_vm_status(&qm, 101).await.expect("status");

    assert_eq!(qm.runner().calls(), vec!["qm status 101"]);
    assert_eq!(status.state(), Some("running"));
    assert_eq!(status.get("name"), Some("web-01"));
    assert_eq!(status.len(), 3);
}

#[tokio::test]
async fn reserved_id_is_rejected_before_qm() {
    let qm = recording_qm(RecordingRunner::new());

    let err = get_vm_status(&qm, 99).await.unwrap_err();

    assert!(
        err.to_string().starts_with("VM ID must be between 100 and 999999999"),
        "got: {err}"
    );
    assert!(qm.runner().calls().is_empty());
}
