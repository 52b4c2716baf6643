// SPDX-License-Identifier: Apache-2.0
//! Conversion from kernel records to client value types.
//!
//! The kernel fills fixed-size arrays and reports how many entries are valid.
//! Nothing here trusts those counts or the termination of string fields:
//! counts are clamped to the array capacity and strings are cut at the first
//! NUL or at `capacity - 1` bytes, whichever comes first.

use std::os::raw::c_int;

use crate::backend::{BackendDescriptor, BackendPool, BackendState};
use crate::ffi::{self, KernBackend, KernBackendPool, KernResult};
use crate::result::{Outcome, ResultRecord};
use crate::task::{TaskHandle, TaskState};

/// Copy a fixed-size C string field, truncating instead of overflowing.
///
/// The returned string is at most `field.len() - 1` bytes long, so it always
/// fits back into the field with its terminator. Invalid UTF-8 is replaced
/// with U+FFFD, and a replacement that would cross the limit is dropped.
pub fn bounded_c_string(field: &[u8]) -> String {
    let limit = field.len().saturating_sub(1);
    let bytes = &field[..limit];
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());

    let mut s = String::from_utf8_lossy(&bytes[..end]).into_owned();
    if s.len() > limit {
        let mut cut = limit;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

/// Clamp a kernel-reported element count to `[0, max]`.
pub fn clamp_count(reported: c_int, max: usize) -> usize {
    usize::try_from(reported).map_or(0, |n| n.min(max))
}

fn non_negative(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Decode a result record.
///
/// `qid` is the handle the caller asked about; the kernel's echo of it is not
/// trusted.
pub fn decode_result(qid: TaskHandle, final_state: TaskState, raw: &KernResult) -> ResultRecord {
    let reported = raw.num_outcomes;
    let n = clamp_count(reported, ffi::QOS_MAX_OUTCOMES);
    if usize::try_from(reported).is_ok_and(|r| r > n) {
        tracing::warn!(
            "task {}: kernel reported {} outcomes, keeping {}",
            qid,
            reported,
            n
        );
    }

    let outcomes = raw.keys[..n]
        .iter()
        .zip(&raw.counts[..n])
        .map(|(key, count)| Outcome {
            bitstring: bounded_c_string(key),
            count: non_negative(*count),
        })
        .collect();

    ResultRecord {
        qid,
        final_state,
        shots: non_negative(raw.shots),
        outcomes,
        error_code: raw.error_code,
        error_info: bounded_c_string(&raw.error_info),
        fidelity_score: raw.fidelity_score,
        num_sub_circuits: raw.num_sub_circuits,
    }
}

/// Decode a single backend record.
pub fn decode_backend(raw: &KernBackend) -> BackendDescriptor {
    let state = BackendState::from_raw(raw.state).unwrap_or_else(|| {
        tracing::warn!(
            "backend {}: unrecognised state {}, treating as offline",
            raw.id,
            raw.state
        );
        BackendState::Offline
    });

    BackendDescriptor {
        id: raw.id,
        name: bounded_c_string(&raw.name),
        total_qubits: raw.total_qubits,
        state,
        current_qid: TaskHandle::new(raw.current_qid).ok(),
        fidelity_score: raw.fidelity_score,
        num_qubits_available: raw.num_qubits_available,
        connectivity_type: raw.connectivity_type,
    }
}

/// Decode the backend pool, clamping the count to the array capacity.
pub fn decode_pool(raw: &KernBackendPool) -> BackendPool {
    let n = clamp_count(raw.num_backends, ffi::QOS_MAX_BACKENDS);
    if n as c_int != raw.num_backends {
        tracing::warn!(
            "kernel reported {} backends, keeping {}",
            raw.num_backends,
            n
        );
    }

    BackendPool {
        backends: raw.backends[..n].iter().map(decode_backend).collect(),
    }
}
