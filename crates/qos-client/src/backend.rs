// SPDX-License-Identifier: Apache-2.0
//! Backend resource pool as reported by the scheduler.

use std::fmt;
use std::os::raw::c_int;

use serde::{Deserialize, Serialize};

use crate::ffi;
use crate::task::TaskHandle;

/// Operating state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendState {
    Idle,
    Busy,
    Calibrating,
    Offline,
}

impl BackendState {
    /// Decode a raw `QBACKEND_STATE_*` value.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            ffi::QBACKEND_STATE_IDLE => Some(BackendState::Idle),
            ffi::QBACKEND_STATE_BUSY => Some(BackendState::Busy),
            ffi::QBACKEND_STATE_CALIBRATING => Some(BackendState::Calibrating),
            ffi::QBACKEND_STATE_OFFLINE => Some(BackendState::Offline),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendState::Idle => "IDLE",
            BackendState::Busy => "BUSY",
            BackendState::Calibrating => "CALIBRATING",
            BackendState::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A schedulable execution resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: i32,
    /// Backend name, at most 31 bytes.
    pub name: String,
    pub total_qubits: i32,
    pub state: BackendState,
    /// Task currently occupying the backend.
    pub current_qid: Option<TaskHandle>,
    /// Calibrated fidelity score; `0` or less means not reported.
    pub fidelity_score: i32,
    pub num_qubits_available: i32,
    pub connectivity_type: i32,
}

/// Snapshot of all backends, at most [`ffi::QOS_MAX_BACKENDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPool {
    pub backends: Vec<BackendDescriptor>,
}

impl BackendPool {
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter()
    }

    /// Number of backends ready to accept work.
    pub fn idle_count(&self) -> usize {
        self.iter()
            .filter(|b| b.state == BackendState::Idle)
            .count()
    }

    /// Total qubits currently free across the pool.
    pub fn available_qubits(&self) -> i64 {
        self.iter()
            .filter(|b| b.state != BackendState::Offline)
            .map(|b| i64::from(b.num_qubits_available.max(0)))
            .sum()
    }
}

impl<'a> IntoIterator for &'a BackendPool {
    type Item = &'a BackendDescriptor;
    type IntoIter = std::slice::Iter<'a, BackendDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.backends.iter()
    }
}
