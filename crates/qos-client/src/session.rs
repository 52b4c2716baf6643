// SPDX-License-Identifier: Apache-2.0
//! Control channel sessions.
//!
//! A session is one open handle on the scheduler device. Every protocol
//! operation opens its own session through a [`Connector`] and drops it
//! before returning, so no handle outlives a call or is held across a poll
//! sleep. Sessions are closed automatically when dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::size_of;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::{QosError, QosResult};
use crate::ffi;

/// The four fixed-shape control exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    Status,
    Result,
    Cancel,
    Resource,
}

impl ControlRequest {
    /// The ioctl request code registered by the kernel.
    pub fn code(self) -> u32 {
        match self {
            ControlRequest::Status => ffi::QIOC_STATUS,
            ControlRequest::Result => ffi::QIOC_RESULT,
            ControlRequest::Cancel => ffi::QIOC_CANCEL,
            ControlRequest::Resource => ffi::QIOC_RESOURCE,
        }
    }

    /// Size in bytes of the record exchanged for this request.
    pub fn record_size(self) -> usize {
        match self {
            ControlRequest::Status => size_of::<ffi::KernStatus>(),
            ControlRequest::Result => size_of::<ffi::KernResult>(),
            ControlRequest::Cancel => size_of::<ffi::KernCancel>(),
            ControlRequest::Resource => size_of::<ffi::KernBackendPool>(),
        }
    }

    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            ControlRequest::Status => "status",
            ControlRequest::Result => "result",
            ControlRequest::Cancel => "cancel",
            ControlRequest::Resource => "resource",
        }
    }
}

/// An open channel to the scheduler.
pub trait Channel {
    /// Write a submission buffer. Returns the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read a reply. Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Perform a control exchange. `arg` is the request record, updated in
    /// place with the kernel's reply. Its length must equal
    /// [`ControlRequest::record_size`]; anything else fails with `EINVAL`.
    fn control(&mut self, request: ControlRequest, arg: &mut [u8]) -> io::Result<()>;
}

/// Opens channels. Each call yields an independent session.
pub trait Connector {
    type Channel: Channel;

    fn open(&self) -> QosResult<Self::Channel>;
}

/// Connector for the real scheduler device.
#[derive(Debug, Clone)]
pub struct DeviceConnector {
    path: PathBuf,
}

impl DeviceConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for DeviceConnector {
    fn default() -> Self {
        Self::new(ffi::QUANTUM_DEV_PATH)
    }
}

impl Connector for DeviceConnector {
    type Channel = DeviceSession;

    fn open(&self) -> QosResult<DeviceSession> {
        DeviceSession::open(&self.path)
    }
}

/// An open handle on the scheduler device.
#[derive(Debug)]
pub struct DeviceSession {
    file: File,
    path: PathBuf,
}

impl DeviceSession {
    /// Open the device read/write.
    pub fn open(path: &Path) -> QosResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| QosError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            "opened session on {} (fd {})",
            path.display(),
            file.as_raw_fd()
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Channel for DeviceSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn control(&mut self, request: ControlRequest, arg: &mut [u8]) -> io::Result<()> {
        if arg.len() != request.record_size() {
            tracing::warn!(
                "{} exchange with a {}-byte buffer, expected {}",
                request.name(),
                arg.len(),
                request.record_size()
            );
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        // SAFETY: `arg` is a live, exclusively borrowed buffer of exactly the
        // record size the kernel reads and writes for `request`.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                request.code() as _,
                arg.as_mut_ptr().cast::<libc::c_void>(),
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        // The file itself is closed by its own Drop.
        tracing::debug!(
            "closed session on {} (fd {})",
            self.path.display(),
            self.file.as_raw_fd()
        );
    }
}
