// SPDX-License-Identifier: Apache-2.0
//! Error types for scheduler client operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskHandle;

/// Errors arising from talking to the kernel scheduler.
///
/// A task that ends in `Failed` is not an error by itself: the poller returns
/// its decoded [`ResultRecord`](crate::ResultRecord), and callers opt into
/// [`QosError::SchedulerReportedFailure`] via
/// [`ResultRecord::into_success`](crate::ResultRecord::into_success).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QosError {
    /// The device file could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rejected at the client boundary before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The submission write/read round trip failed or returned a bad handle.
    #[error("submit failed: {0}")]
    SubmitFailed(String),

    /// A status, cancel or resource exchange failed in transport.
    #[error("{op} exchange failed: {source}")]
    ControlExchangeFailed {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The scheduler has no record of the task.
    #[error("task {0} not found")]
    NotFound(TaskHandle),

    /// The task already started executing and can no longer be cancelled.
    #[error("task {0} is already running and cannot be cancelled")]
    NotCancellable(TaskHandle),

    /// The polling budget ran out before the task reached a terminal state.
    #[error("timeout after {waited_ms}ms waiting for task {qid}")]
    Timeout { qid: TaskHandle, waited_ms: u64 },

    /// A large kernel record buffer could not be allocated.
    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),

    /// The task reached a terminal state but its result could not be read.
    #[error("fetching result of task {qid} failed: {source}")]
    ResultFetchFailed {
        qid: TaskHandle,
        #[source]
        source: std::io::Error,
    },

    /// The scheduler ran the task and reported a failure.
    #[error("task {qid} failed (code={code}: {info})")]
    SchedulerReportedFailure {
        qid: TaskHandle,
        code: i32,
        info: String,
    },
}

impl QosError {
    /// Numeric code in the `QOS_ERR_*` space used by the C tooling.
    ///
    /// Both transport failures of a control exchange and of the result fetch
    /// report `-3` (the ioctl class). `NotCancellable` has no legacy
    /// equivalent and takes `-9`.
    pub fn code(&self) -> i32 {
        match self {
            QosError::OpenFailed { .. } => -1,
            QosError::SubmitFailed(_) => -2,
            QosError::ControlExchangeFailed { .. } | QosError::ResultFetchFailed { .. } => -3,
            QosError::Timeout { .. } => -4,
            QosError::NotFound(_) => -5,
            QosError::InvalidArgument(_) => -6,
            QosError::OutOfMemory(_) => -7,
            QosError::SchedulerReportedFailure { .. } => -8,
            QosError::NotCancellable(_) => -9,
        }
    }

    /// Whether retrying the same call from a fresh session could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QosError::ControlExchangeFailed { .. }
                | QosError::ResultFetchFailed { .. }
                | QosError::Timeout { .. }
        )
    }
}

/// Result type for client operations.
pub type QosResult<T> = Result<T, QosError>;
