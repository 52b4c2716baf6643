// SPDX-License-Identifier: Apache-2.0
//! Task identity, lifecycle and submission configuration.
//!
//! The scheduler's task state machine:
//!
//! ```text
//!   submit() ──→ Received ──→ Queued ──→ Running ──→ Success
//!                               │           │  ↑
//!                               │           ↓  │
//!                               │         Merging ──→ Failed
//!                               │
//!                               └──→ Cancelled
//! ```
//!
//! `Unknown` sits outside the graph: it is what the kernel reports for a qid
//! it has no record of, either because the task was never submitted or
//! because it was reaped after termination.

use std::fmt;
use std::os::raw::c_int;

use serde::{Deserialize, Serialize};

use crate::error::{QosError, QosResult};
use crate::ffi;

/// Scheduler-assigned task identifier (`qid`). Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct TaskHandle(i32);

impl TaskHandle {
    /// Validate a raw qid. Values `<= 0` are never issued by the scheduler.
    pub fn new(raw: i32) -> QosResult<Self> {
        if raw <= 0 {
            return Err(QosError::InvalidArgument(format!(
                "task handle must be positive, got {raw}"
            )));
        }
        Ok(Self(raw))
    }

    /// The raw value sent over the wire.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for TaskHandle {
    type Error = QosError;

    fn try_from(raw: i32) -> QosResult<Self> {
        Self::new(raw)
    }
}

impl From<TaskHandle> for i32 {
    fn from(handle: TaskHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task state as reported by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// No such task, or not yet visible.
    #[default]
    Unknown,
    Received,
    Queued,
    Running,
    Success,
    Failed,
    Cancelled,
    /// A split circuit whose sub-results are being recombined.
    Merging,
}

impl TaskState {
    /// Decode a raw `QTASK_STATE_*` value. Anything out of range is `Unknown`.
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            ffi::QTASK_STATE_RECEIVED => TaskState::Received,
            ffi::QTASK_STATE_QUEUED => TaskState::Queued,
            ffi::QTASK_STATE_RUNNING => TaskState::Running,
            ffi::QTASK_STATE_SUCCESS => TaskState::Success,
            ffi::QTASK_STATE_FAILED => TaskState::Failed,
            ffi::QTASK_STATE_CANCELLED => TaskState::Cancelled,
            ffi::QTASK_STATE_MERGING => TaskState::Merging,
            _ => TaskState::Unknown,
        }
    }

    /// The raw `QTASK_STATE_*` value.
    pub fn as_raw(self) -> c_int {
        match self {
            TaskState::Unknown => ffi::QTASK_STATE_UNKNOWN,
            TaskState::Received => ffi::QTASK_STATE_RECEIVED,
            TaskState::Queued => ffi::QTASK_STATE_QUEUED,
            TaskState::Running => ffi::QTASK_STATE_RUNNING,
            TaskState::Success => ffi::QTASK_STATE_SUCCESS,
            TaskState::Failed => ffi::QTASK_STATE_FAILED,
            TaskState::Cancelled => ffi::QTASK_STATE_CANCELLED,
            TaskState::Merging => ffi::QTASK_STATE_MERGING,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Check if the task is known to be in flight.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            TaskState::Received | TaskState::Queued | TaskState::Running | TaskState::Merging
        )
    }

    /// Upper-case name, as printed by the command-line tools.
    pub fn name(self) -> &'static str {
        match self {
            TaskState::Unknown => "UNKNOWN",
            TaskState::Received => "RECEIVED",
            TaskState::Queued => "QUEUED",
            TaskState::Running => "RUNNING",
            TaskState::Success => "SUCCESS",
            TaskState::Failed => "FAILED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::Merging => "MERGING",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error mitigation applied by the scheduler to the raw counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMitigation {
    #[default]
    None,
    /// Measurement-error mitigation.
    Mem,
    /// Clifford data regression.
    Cdr,
    /// Probabilistic error cancellation.
    Pec,
}

impl ErrorMitigation {
    pub fn wire_value(self) -> i32 {
        match self {
            ErrorMitigation::None => 0,
            ErrorMitigation::Mem => 1,
            ErrorMitigation::Cdr => 2,
            ErrorMitigation::Pec => 3,
        }
    }
}

/// Backend allocation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocStrategy {
    #[default]
    FirstFit,
    Fidelity,
    Regression,
    Topo,
}

impl AllocStrategy {
    pub fn wire_value(self) -> i32 {
        match self {
            AllocStrategy::FirstFit => 0,
            AllocStrategy::Fidelity => 1,
            AllocStrategy::Regression => 2,
            AllocStrategy::Topo => 3,
        }
    }
}

/// Circuit splitting strategy for circuits larger than any single backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    #[default]
    None,
    SpaceNaive,
    Time,
    SpaceProb,
    TopoAware,
}

impl SplitStrategy {
    pub fn wire_value(self) -> i32 {
        match self {
            SplitStrategy::None => 0,
            SplitStrategy::SpaceNaive => 1,
            SplitStrategy::Time => 2,
            SplitStrategy::SpaceProb => 3,
            SplitStrategy::TopoAware => 4,
        }
    }
}

/// Per-submission configuration, rendered into the header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Number of measurement repetitions. Must be at least 1.
    pub shots: u32,
    /// Scheduling priority.
    pub priority: i32,
    pub error_mitigation: ErrorMitigation,
    pub alloc_strategy: AllocStrategy,
    pub split_strategy: SplitStrategy,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            shots: 1000,
            priority: 0,
            error_mitigation: ErrorMitigation::None,
            alloc_strategy: AllocStrategy::FirstFit,
            split_strategy: SplitStrategy::None,
        }
    }
}

impl SubmissionConfig {
    /// Set the number of shots.
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = shots;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the error mitigation method.
    pub fn with_error_mitigation(mut self, mitigation: ErrorMitigation) -> Self {
        self.error_mitigation = mitigation;
        self
    }

    /// Set the backend allocation strategy.
    pub fn with_alloc_strategy(mut self, strategy: AllocStrategy) -> Self {
        self.alloc_strategy = strategy;
        self
    }

    /// Set the circuit splitting strategy.
    pub fn with_split_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.split_strategy = strategy;
        self
    }
}
