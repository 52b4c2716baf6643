// SPDX-License-Identifier: Apache-2.0
//! Raw constants and record layouts shared with the kernel scheduler.
//!
//! Everything in this module mirrors the kernel's `quantum_types.h` byte for
//! byte. Field order, widths and padding must not be changed independently of
//! the kernel module; the size assertions at the bottom of the file fail the
//! build if a record drifts.
//!
//! Only [`crate::control`] and [`crate::decode`] touch these types. The rest
//! of the crate works with the value types in [`crate::task`],
//! [`crate::result`] and [`crate::backend`].

use std::mem::size_of;
use std::os::raw::c_int;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

// ===========================================================================
// Device and protocol limits
// ===========================================================================

/// Default path of the scheduler's character device.
pub const QUANTUM_DEV_PATH: &str = "/dev/quantum";

/// Upper bound (exclusive) on an encoded submission, header included.
pub const QOS_QIR_SIZE: usize = 4096;

pub const QOS_MAX_OUTCOMES: usize = 32;
pub const QOS_KEY_LEN: usize = 192;
pub const QOS_ERROR_INFO_LEN: usize = 128;
pub const QOS_BACKEND_NAME_LEN: usize = 32;
pub const QOS_MAX_BACKENDS: usize = 8;

// ===========================================================================
// ioctl request codes
//
// The kernel registers its control commands with `_IO('Q', nr)`, i.e. no
// direction or size bits: `(magic << 8) | nr`.
// ===========================================================================

pub const QIOC_MAGIC: u8 = b'Q';

const fn qioc(nr: u8) -> u32 {
    ((QIOC_MAGIC as u32) << 8) | nr as u32
}

pub const QIOC_STATUS: u32 = qioc(2);
pub const QIOC_RESULT: u32 = qioc(3);
pub const QIOC_CANCEL: u32 = qioc(4);
pub const QIOC_RESOURCE: u32 = qioc(5);

// ===========================================================================
// Task state codes (QTASK_STATE_*)
// ===========================================================================

pub const QTASK_STATE_UNKNOWN: c_int = 0;
pub const QTASK_STATE_RECEIVED: c_int = 1;
pub const QTASK_STATE_QUEUED: c_int = 2;
pub const QTASK_STATE_RUNNING: c_int = 3;
pub const QTASK_STATE_SUCCESS: c_int = 4;
pub const QTASK_STATE_FAILED: c_int = 5;
pub const QTASK_STATE_CANCELLED: c_int = 6;
pub const QTASK_STATE_MERGING: c_int = 7;

// ===========================================================================
// Backend state codes (QBACKEND_STATE_*)
// ===========================================================================

pub const QBACKEND_STATE_IDLE: c_int = 0;
pub const QBACKEND_STATE_BUSY: c_int = 1;
pub const QBACKEND_STATE_CALIBRATING: c_int = 2;
pub const QBACKEND_STATE_OFFLINE: c_int = 3;

// ===========================================================================
// Records
//
// All records derive the zerocopy traits: any byte pattern is a valid value,
// and `IntoBytes` rejects implicit padding at compile time, so every padding
// byte the kernel's compiler inserts has to be spelled out as a field.
// ===========================================================================

/// `struct quantum_status_req`: `qid` in, `state` written back in place.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct KernStatus {
    pub qid: c_int,
    pub state: c_int,
}

/// `struct quantum_cancel_req`.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct KernCancel {
    pub qid: c_int,
}

/// `struct quantum_result`.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct KernResult {
    pub qid: c_int,
    pub shots: c_int,
    pub num_outcomes: c_int,
    pub keys: [[u8; QOS_KEY_LEN]; QOS_MAX_OUTCOMES],
    pub counts: [c_int; QOS_MAX_OUTCOMES],
    pub error_code: c_int,
    pub error_info: [u8; QOS_ERROR_INFO_LEN],
    pub fidelity_score: c_int,
    pub num_sub_circuits: c_int,
}

/// `struct quantum_backend`.
///
/// Seven 4-byte fields and the name bring the offset to 60; the kernel's
/// 8-byte `last_calibration_time` is aligned to 64, hence `_pad`.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct KernBackend {
    pub id: c_int,
    pub name: [u8; QOS_BACKEND_NAME_LEN],
    pub total_qubits: c_int,
    pub state: c_int,
    pub current_qid: c_int,
    pub fidelity_score: c_int,
    pub num_qubits_available: c_int,
    pub connectivity_type: c_int,
    pub _pad: u32,
    pub last_calibration_time: u64,
}

/// `struct quantum_backend_pool`. The trailing `_pad` is the tail padding the
/// kernel compiler inserts to keep the array 8-byte aligned.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct KernBackendPool {
    pub backends: [KernBackend; QOS_MAX_BACKENDS],
    pub num_backends: c_int,
    pub _pad: u32,
}

// ===========================================================================
// Layout checks (must match sizeof() in the kernel)
//
//   quantum_result:       3*4 + 32*192 + 32*4 + 4 + 128 + 2*4 = 6424
//   quantum_backend:      4 + 32 + 6*4 + 4 (pad) + 8         =   72
//   quantum_backend_pool: 8*72 + 4 + 4 (tail pad)            =  584
// ===========================================================================

pub const KERN_RESULT_SIZE: usize = 6424;
pub const KERN_BACKEND_SIZE: usize = 72;
pub const KERN_BACKEND_POOL_SIZE: usize = 584;

const _: () = assert!(size_of::<KernStatus>() == 8);
const _: () = assert!(size_of::<KernCancel>() == 4);
const _: () = assert!(size_of::<KernResult>() == KERN_RESULT_SIZE);
const _: () = assert!(size_of::<KernBackend>() == KERN_BACKEND_SIZE);
const _: () = assert!(size_of::<KernBackendPool>() == KERN_BACKEND_POOL_SIZE);
const _: () = assert!(std::mem::offset_of!(KernBackend, last_calibration_time) == 64);
