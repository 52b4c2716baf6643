// SPDX-License-Identifier: Apache-2.0
//! Protocol-level tests against the in-memory scheduler.
//!
//! Covers submission, the control exchanges and session hygiene. Polling
//! behaviour lives in `poller_behaviour.rs`.

use qos_client::mock::{MockScheduler, StatusReading};
use qos_client::{
    AllocStrategy, BackendState, ControlRequest, ErrorMitigation, QosClient, QosError,
    SplitStrategy, SubmissionConfig, TaskHandle, TaskState, control, ffi, submit,
};

const BELL: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n";

fn qid(raw: i32) -> TaskHandle {
    TaskHandle::new(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[test]
fn test_submit_returns_positive_handle() {
    let sched = MockScheduler::new();
    let first = submit::submit(&sched, BELL, &SubmissionConfig::default()).unwrap();
    let second = submit::submit(&sched, BELL, &SubmissionConfig::default()).unwrap();
    assert!(first.get() > 0);
    assert_ne!(first, second);
}

#[test]
fn test_submit_sends_header_then_circuit() {
    let sched = MockScheduler::new();
    let config = SubmissionConfig::default()
        .with_shots(2000)
        .with_priority(3)
        .with_error_mitigation(ErrorMitigation::Cdr)
        .with_alloc_strategy(AllocStrategy::Fidelity)
        .with_split_strategy(SplitStrategy::Time);

    let handle = submit::submit(&sched, BELL, &config).unwrap();

    let sent = sched.submissions();
    assert_eq!(sent.len(), 1);
    let text = String::from_utf8(sent[0].clone()).unwrap();
    assert!(text.starts_with(
        "shots=2000 priority=3 mitigation=2 alloc_strategy=1 split_strategy=2\n"
    ));
    assert!(sent[0].len() < ffi::QOS_QIR_SIZE);
    assert_eq!(sched.circuit(handle).unwrap(), BELL.as_bytes());
}

#[test]
fn test_oversized_submission_does_no_io() {
    let sched = MockScheduler::new();
    let huge = "x".repeat(ffi::QOS_QIR_SIZE);
    let err = submit::submit(&sched, &huge, &SubmissionConfig::default()).unwrap_err();
    assert!(matches!(err, QosError::InvalidArgument(_)));
    assert_eq!(sched.opens(), 0);
}

#[test]
fn test_empty_circuit_does_no_io() {
    let sched = MockScheduler::new();
    let err = submit::submit(&sched, "", &SubmissionConfig::default()).unwrap_err();
    assert!(matches!(err, QosError::InvalidArgument(_)));
    assert_eq!(sched.opens(), 0);
}

#[test]
fn test_short_write_is_submit_failure() {
    let sched = MockScheduler::new();
    sched.limit_writes(16);
    let err = submit::submit(&sched, BELL, &SubmissionConfig::default()).unwrap_err();
    assert!(matches!(err, QosError::SubmitFailed(_)));
    assert_eq!(sched.submissions().len(), 1);
}

#[test]
fn test_non_positive_reply_is_submit_failure() {
    for raw in [0, -1] {
        let sched = MockScheduler::new();
        sched.override_reply(raw);
        let err = submit::submit(&sched, BELL, &SubmissionConfig::default()).unwrap_err();
        assert!(matches!(err, QosError::SubmitFailed(_)), "reply {raw}");
    }
}

#[test]
fn test_open_failure_on_submit() {
    let sched = MockScheduler::new();
    sched.refuse_open(true);
    let err = submit::submit(&sched, BELL, &SubmissionConfig::default()).unwrap_err();
    assert!(matches!(err, QosError::OpenFailed { .. }));
    assert_eq!(err.code(), -1);
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

#[test]
fn test_non_positive_handle_rejected_without_io() {
    for raw in [0, -5, i32::MIN] {
        assert!(matches!(
            TaskHandle::new(raw),
            Err(QosError::InvalidArgument(_))
        ));
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn test_status_reports_state() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Merging);
    assert_eq!(control::status(&sched, handle).unwrap(), TaskState::Merging);
}

#[test]
fn test_status_of_missing_task_is_unknown() {
    let sched = MockScheduler::new();
    assert_eq!(control::status(&sched, qid(77)).unwrap(), TaskState::Unknown);

    let handle = sched.add_task(TaskState::Success);
    sched.reap(handle);
    assert_eq!(control::status(&sched, handle).unwrap(), TaskState::Unknown);
}

#[test]
fn test_status_transport_error() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Running);
    sched.script_status(handle, [StatusReading::Errno(libc::EIO)]);
    match control::status(&sched, handle) {
        Err(QosError::ControlExchangeFailed { op, source }) => {
            assert_eq!(op, "status");
            assert_eq!(source.raw_os_error(), Some(libc::EIO));
        }
        other => panic!("expected ControlExchangeFailed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

#[test]
fn test_cancel_queued_task() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Queued);
    control::cancel(&sched, handle).unwrap();
    assert_eq!(control::status(&sched, handle).unwrap(), TaskState::Cancelled);
}

#[test]
fn test_cancel_running_task_is_not_cancellable() {
    let sched = MockScheduler::new();
    for state in [TaskState::Running, TaskState::Merging] {
        let handle = sched.add_task(state);
        let err = control::cancel(&sched, handle).unwrap_err();
        assert!(matches!(err, QosError::NotCancellable(q) if q == handle));
        assert_eq!(control::status(&sched, handle).unwrap(), state);
    }
}

#[test]
fn test_cancel_missing_task_is_not_found() {
    let sched = MockScheduler::new();
    let err = control::cancel(&sched, qid(404)).unwrap_err();
    assert!(matches!(err, QosError::NotFound(q) if q.get() == 404));
    assert_ne!(err.code(), QosError::NotCancellable(qid(404)).code());
}

#[test]
fn test_cancel_other_errno_is_exchange_failure() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Queued);
    sched.inject_errno(ControlRequest::Cancel, libc::EPERM);
    assert!(matches!(
        control::cancel(&sched, handle),
        Err(QosError::ControlExchangeFailed { op: "cancel", .. })
    ));
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[test]
fn test_fetch_result_decodes_record() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Success);
    sched.set_result(handle, 1024, &[("00", 498), ("11", 510), ("01", 16)]);
    sched.edit_result(handle, |r| {
        r.fidelity_score = 91;
        r.num_sub_circuits = 2;
    });

    let record = control::fetch_result(&sched, handle, TaskState::Success).unwrap();
    assert_eq!(record.qid, handle);
    assert_eq!(record.shots, 1024);
    assert_eq!(record.outcomes.len(), 3);
    assert_eq!(record.most_frequent().unwrap().bitstring, "11");
    assert_eq!(record.fidelity_score, 91);
    assert_eq!(record.num_sub_circuits, 2);
}

#[test]
fn test_fetch_result_clamps_reported_outcomes() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Success);
    sched.edit_result(handle, |r| {
        r.num_outcomes = 40;
        r.keys = [[b'1'; ffi::QOS_KEY_LEN]; ffi::QOS_MAX_OUTCOMES];
        r.counts = [1; ffi::QOS_MAX_OUTCOMES];
    });

    let record = control::fetch_result(&sched, handle, TaskState::Success).unwrap();
    assert_eq!(record.outcomes.len(), ffi::QOS_MAX_OUTCOMES);
    assert!(
        record
            .outcomes
            .iter()
            .all(|o| o.bitstring.len() <= ffi::QOS_KEY_LEN - 1)
    );
}

#[test]
fn test_fetch_result_transport_error() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Success);
    sched.inject_errno(ControlRequest::Result, libc::EIO);
    let err = control::fetch_result(&sched, handle, TaskState::Success).unwrap_err();
    assert!(matches!(err, QosError::ResultFetchFailed { qid, .. } if qid == handle));
    assert_eq!(err.code(), -3);
}

#[test]
fn test_failed_task_result_into_success() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Failed);
    sched.edit_result(handle, |r| {
        r.error_code = 4;
        let msg = b"qubit 7 exceeds device width";
        r.error_info[..msg.len()].copy_from_slice(msg);
    });

    let record = control::fetch_result(&sched, handle, TaskState::Failed).unwrap();
    assert!(record.is_failure());
    match record.into_success() {
        Err(QosError::SchedulerReportedFailure { code, info, .. }) => {
            assert_eq!(code, 4);
            assert_eq!(info, "qubit 7 exceeds device width");
        }
        other => panic!("expected SchedulerReportedFailure, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

#[test]
fn test_resource_snapshot() {
    let sched = MockScheduler::new();
    sched.add_backend("ibm_sim_0", 27, BackendState::Idle);
    sched.add_backend("ionq_sim_1", 11, BackendState::Busy);
    sched.add_backend("rigetti_2", 40, BackendState::Calibrating);
    sched.edit_pool(|p| p.backends[1].current_qid = 12);

    let pool = control::resource(&sched).unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.backends[0].name, "ibm_sim_0");
    assert_eq!(pool.backends[1].state, BackendState::Busy);
    assert_eq!(pool.backends[1].current_qid, Some(qid(12)));
    assert_eq!(pool.backends[2].state, BackendState::Calibrating);
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_resource_clamps_backend_count() {
    let sched = MockScheduler::new();
    sched.edit_pool(|p| p.num_backends = 12);
    assert_eq!(control::resource(&sched).unwrap().len(), ffi::QOS_MAX_BACKENDS);
}

#[test]
fn test_resource_transport_error() {
    let sched = MockScheduler::new();
    sched.inject_errno(ControlRequest::Resource, libc::ENOTTY);
    assert!(matches!(
        control::resource(&sched),
        Err(QosError::ControlExchangeFailed { op: "resource", .. })
    ));
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[test]
fn test_each_operation_uses_one_session() {
    let sched = MockScheduler::new();
    let client = QosClient::new(sched.clone());

    let handle = client.submit(BELL, None).unwrap();
    assert_eq!((sched.opens(), sched.open_sessions()), (1, 0));

    client.status(handle).unwrap();
    assert_eq!((sched.opens(), sched.open_sessions()), (2, 0));

    client.cancel(handle).unwrap();
    assert_eq!((sched.opens(), sched.open_sessions()), (3, 0));

    client.resource().unwrap();
    assert_eq!((sched.opens(), sched.open_sessions()), (4, 0));

    client.fetch_result(handle).unwrap();
    assert_eq!((sched.opens(), sched.open_sessions()), (5, 0));
}

#[test]
fn test_sessions_released_on_error_paths() {
    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Running);

    let _ = control::cancel(&sched, handle);
    sched.inject_errno(ControlRequest::Result, libc::EIO);
    let _ = control::fetch_result(&sched, handle, TaskState::Success);
    sched.limit_writes(4);
    let _ = submit::submit(&sched, BELL, &SubmissionConfig::default());

    assert_eq!(sched.opens(), 3);
    assert_eq!(sched.open_sessions(), 0);
}

#[test]
fn test_mock_rejects_mis_sized_control_buffer() {
    use qos_client::{Channel, Connector};

    let sched = MockScheduler::new();
    let handle = sched.add_task(TaskState::Queued);
    let mut channel = sched.open().unwrap();

    let mut short = handle.get().to_ne_bytes();
    let err = channel.control(ControlRequest::Status, &mut short).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EINVAL));

    let mut arg = vec![0u8; ControlRequest::Status.record_size()];
    arg[..4].copy_from_slice(&handle.get().to_ne_bytes());
    channel.control(ControlRequest::Status, &mut arg).unwrap();
    assert_eq!(&arg[4..], &TaskState::Queued.as_raw().to_ne_bytes()[..]);
}
