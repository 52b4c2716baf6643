// SPDX-License-Identifier: Apache-2.0
//! The fixed-shape control exchanges: status, cancel, result, resource.
//!
//! | Exchange | Request record | Reply | "no such task" |
//! |----------|----------------|-------|----------------|
//! | status   | `KernStatus{qid}` | `state` in place | `Ok(Unknown)` |
//! | cancel   | `KernCancel{qid}` | none | `NotFound` |
//! | result   | `KernResult{qid}` | whole record in place | `ResultFetchFailed` |
//! | resource | `KernBackendPool` | whole record in place | n/a |
//!
//! Each call opens a fresh session and closes it before returning.

use std::io;

use crate::backend::BackendPool;
use crate::decode;
use crate::error::{QosError, QosResult};
use crate::ffi::{self, KernBackendPool, KernCancel, KernResult, KernStatus};
use crate::result::ResultRecord;
use crate::session::{Channel, Connector, ControlRequest};
use crate::task::{TaskHandle, TaskState};

use zerocopy::{FromZeros, IntoBytes};

/// `errno` the kernel uses for a qid it has no record of.
pub const ERRNO_NOT_FOUND: i32 = libc::ENOENT;

/// `errno` the kernel uses to refuse cancelling a task that already started.
pub const ERRNO_NOT_CANCELLABLE: i32 = libc::EBUSY;

fn has_errno(err: &io::Error, errno: i32) -> bool {
    err.raw_os_error() == Some(errno)
}

/// Heap-allocate a zeroed kernel record; the large ones never go on the stack.
fn boxed_record<T: FromZeros>(what: &'static str) -> QosResult<Box<T>> {
    T::new_box_zeroed().map_err(|_| QosError::OutOfMemory(what))
}

/// Query the state of a task.
///
/// A task the scheduler does not know about reads as [`TaskState::Unknown`],
/// not as an error.
pub fn status<C: Connector>(connector: &C, qid: TaskHandle) -> QosResult<TaskState> {
    let mut req = KernStatus {
        qid: qid.get(),
        state: ffi::QTASK_STATE_UNKNOWN,
    };

    let mut channel = connector.open()?;
    match channel.control(ControlRequest::Status, req.as_mut_bytes()) {
        Ok(()) => Ok(TaskState::from_raw(req.state)),
        Err(e) if has_errno(&e, ERRNO_NOT_FOUND) => Ok(TaskState::Unknown),
        Err(source) => Err(QosError::ControlExchangeFailed {
            op: ControlRequest::Status.name(),
            source,
        }),
    }
}

/// Cancel a task that has not started executing.
pub fn cancel<C: Connector>(connector: &C, qid: TaskHandle) -> QosResult<()> {
    let mut req = KernCancel { qid: qid.get() };

    let mut channel = connector.open()?;
    match channel.control(ControlRequest::Cancel, req.as_mut_bytes()) {
        Ok(()) => {
            tracing::info!("cancelled task {}", qid);
            Ok(())
        }
        Err(e) if has_errno(&e, ERRNO_NOT_FOUND) => Err(QosError::NotFound(qid)),
        Err(e) if has_errno(&e, ERRNO_NOT_CANCELLABLE) => Err(QosError::NotCancellable(qid)),
        Err(source) => Err(QosError::ControlExchangeFailed {
            op: ControlRequest::Cancel.name(),
            source,
        }),
    }
}

/// Fetch and decode the result record of a terminated task.
///
/// `final_state` is the terminal state the caller observed; it is carried
/// into the decoded record.
pub fn fetch_result<C: Connector>(
    connector: &C,
    qid: TaskHandle,
    final_state: TaskState,
) -> QosResult<ResultRecord> {
    let mut raw = boxed_record::<KernResult>("result record")?;
    raw.qid = qid.get();

    let mut channel = connector.open()?;
    channel
        .control(ControlRequest::Result, raw.as_mut_bytes())
        .map_err(|source| QosError::ResultFetchFailed { qid, source })?;
    drop(channel);

    Ok(decode::decode_result(qid, final_state, &raw))
}

/// Snapshot the backend pool.
pub fn resource<C: Connector>(connector: &C) -> QosResult<BackendPool> {
    let mut raw = boxed_record::<KernBackendPool>("backend pool record")?;

    let mut channel = connector.open()?;
    channel
        .control(ControlRequest::Resource, raw.as_mut_bytes())
        .map_err(|source| QosError::ControlExchangeFailed {
            op: ControlRequest::Resource.name(),
            source,
        })?;
    drop(channel);

    Ok(decode::decode_pool(&raw))
}
