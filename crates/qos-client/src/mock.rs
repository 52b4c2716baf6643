// SPDX-License-Identifier: Apache-2.0
//! In-memory stand-in for the kernel scheduler.
//!
//! [`MockScheduler`] implements [`Connector`] and speaks the same byte-level
//! protocol as the device: submissions are written and answered with a
//! native-endian qid, control exchanges receive and fill the exact kernel
//! record sizes. Status readings can be scripted per task to reproduce the
//! state flicker of split circuits, and faults can be injected per exchange.
//!
//! Every session opened is counted, so tests can check that operations open
//! and release exactly the sessions they should.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::backend::BackendState;
use crate::control::{ERRNO_NOT_CANCELLABLE, ERRNO_NOT_FOUND};
use crate::error::{QosError, QosResult};
use crate::ffi::{self, KernBackendPool, KernResult};
use crate::poller::Sleeper;
use crate::session::{Channel, Connector, ControlRequest};
use crate::task::{TaskHandle, TaskState};

use zerocopy::{FromZeros, IntoBytes};

/// One answer to a status exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReading {
    /// The exchange succeeds and reports this state.
    State(TaskState),
    /// The kernel has no record of the task (`ENOENT`).
    Missing,
    /// The exchange fails with this `errno`.
    Errno(i32),
}

impl From<TaskState> for StatusReading {
    fn from(state: TaskState) -> Self {
        StatusReading::State(state)
    }
}

struct MockTask {
    /// Readings served by upcoming status exchanges, in order.
    script: VecDeque<StatusReading>,
    /// Last served reading; repeated once the script runs dry.
    current: StatusReading,
    result: Box<KernResult>,
    circuit: Vec<u8>,
}

impl MockTask {
    fn new(state: TaskState) -> Self {
        let mut result = Box::new(KernResult::new_zeroed());
        result.shots = 1000;
        Self {
            script: VecDeque::new(),
            current: StatusReading::State(state),
            result,
            circuit: Vec::new(),
        }
    }
}

struct MockState {
    next_qid: i32,
    tasks: HashMap<i32, MockTask>,
    pool: Box<KernBackendPool>,
    submissions: Vec<Vec<u8>>,
    exchanges: Vec<ControlRequest>,
    opens: usize,
    closes: usize,
    refuse_open: bool,
    faults: HashMap<ControlRequest, i32>,
    write_limit: Option<usize>,
    reply_override: Option<i32>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_qid: 1,
            tasks: HashMap::new(),
            pool: Box::new(KernBackendPool::new_zeroed()),
            submissions: Vec::new(),
            exchanges: Vec::new(),
            opens: 0,
            closes: 0,
            refuse_open: false,
            faults: HashMap::new(),
            write_limit: None,
            reply_override: None,
        }
    }
}

impl fmt::Debug for MockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockState")
            .field("tasks", &self.tasks.len())
            .field("submissions", &self.submissions.len())
            .field("opens", &self.opens)
            .field("closes", &self.closes)
            .finish_non_exhaustive()
    }
}

/// A scriptable in-memory scheduler. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockScheduler {
    state: Arc<Mutex<MockState>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task in the given state and return its handle.
    pub fn add_task(&self, state: TaskState) -> TaskHandle {
        let mut s = self.lock();
        let raw = s.next_qid;
        s.next_qid += 1;
        s.tasks.insert(raw, MockTask::new(state));
        TaskHandle::new(raw).unwrap_or_else(|_| unreachable!("mock qids start at 1"))
    }

    /// Queue status readings for a task. After the last one is served it
    /// keeps being reported.
    pub fn script_status<I, R>(&self, qid: TaskHandle, readings: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<StatusReading>,
    {
        let mut s = self.lock();
        if let Some(task) = s.tasks.get_mut(&qid.get()) {
            task.script.extend(readings.into_iter().map(Into::into));
        }
    }

    /// Set the state reported for a task from now on.
    pub fn set_state(&self, qid: TaskHandle, state: TaskState) {
        let mut s = self.lock();
        if let Some(task) = s.tasks.get_mut(&qid.get()) {
            task.script.clear();
            task.current = StatusReading::State(state);
        }
    }

    /// Store a result for a task: `(bitstring, count)` pairs.
    pub fn set_result(&self, qid: TaskHandle, shots: i32, outcomes: &[(&str, i32)]) {
        self.edit_result(qid, |r| {
            r.shots = shots;
            r.num_outcomes = outcomes.len().min(ffi::QOS_MAX_OUTCOMES) as i32;
            for (i, (key, count)) in outcomes.iter().take(ffi::QOS_MAX_OUTCOMES).enumerate() {
                let bytes = key.as_bytes();
                let n = bytes.len().min(ffi::QOS_KEY_LEN);
                r.keys[i] = [0; ffi::QOS_KEY_LEN];
                r.keys[i][..n].copy_from_slice(&bytes[..n]);
                r.counts[i] = *count;
            }
        });
    }

    /// Edit the raw kernel result record of a task.
    pub fn edit_result(&self, qid: TaskHandle, edit: impl FnOnce(&mut KernResult)) {
        let mut s = self.lock();
        if let Some(task) = s.tasks.get_mut(&qid.get()) {
            edit(&mut *task.result);
        }
    }

    /// Forget a task, as the kernel does when it reaps a terminated task.
    pub fn reap(&self, qid: TaskHandle) {
        self.lock().tasks.remove(&qid.get());
    }

    /// Append a backend to the pool and bump the reported count.
    pub fn add_backend(&self, name: &str, total_qubits: i32, state: BackendState) {
        let mut s = self.lock();
        let idx = usize::try_from(s.pool.num_backends).unwrap_or(0);
        if idx >= ffi::QOS_MAX_BACKENDS {
            return;
        }
        let backend = &mut s.pool.backends[idx];
        backend.id = idx as i32;
        let n = name.len().min(ffi::QOS_BACKEND_NAME_LEN);
        backend.name = [0; ffi::QOS_BACKEND_NAME_LEN];
        backend.name[..n].copy_from_slice(&name.as_bytes()[..n]);
        backend.total_qubits = total_qubits;
        backend.num_qubits_available = if state == BackendState::Idle {
            total_qubits
        } else {
            0
        };
        backend.state = match state {
            BackendState::Idle => ffi::QBACKEND_STATE_IDLE,
            BackendState::Busy => ffi::QBACKEND_STATE_BUSY,
            BackendState::Calibrating => ffi::QBACKEND_STATE_CALIBRATING,
            BackendState::Offline => ffi::QBACKEND_STATE_OFFLINE,
        };
        backend.current_qid = -1;
        s.pool.num_backends += 1;
    }

    /// Edit the raw kernel pool record.
    pub fn edit_pool(&self, edit: impl FnOnce(&mut KernBackendPool)) {
        edit(&mut *self.lock().pool);
    }

    /// Make every subsequent `open` fail with `EACCES`.
    pub fn refuse_open(&self, refuse: bool) {
        self.lock().refuse_open = refuse;
    }

    /// Fail the next exchange of this kind with `errno`.
    pub fn inject_errno(&self, request: ControlRequest, errno: i32) {
        self.lock().faults.insert(request, errno);
    }

    /// Accept at most `limit` bytes per submission write.
    pub fn limit_writes(&self, limit: usize) {
        self.lock().write_limit = Some(limit);
    }

    /// Answer submissions with this raw qid instead of a fresh one.
    pub fn override_reply(&self, raw_qid: i32) {
        self.lock().reply_override = Some(raw_qid);
    }

    /// Number of sessions opened so far.
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        let s = self.lock();
        s.opens - s.closes
    }

    /// Control exchanges performed, in order.
    pub fn exchanges(&self) -> Vec<ControlRequest> {
        self.lock().exchanges.clone()
    }

    pub fn exchange_count(&self, request: ControlRequest) -> usize {
        self.lock()
            .exchanges
            .iter()
            .filter(|r| **r == request)
            .count()
    }

    /// Raw submission buffers, in order.
    pub fn submissions(&self) -> Vec<Vec<u8>> {
        self.lock().submissions.clone()
    }

    /// Circuit payload stored for a task (header stripped), if it exists.
    pub fn circuit(&self, qid: TaskHandle) -> Option<Vec<u8>> {
        self.lock().tasks.get(&qid.get()).map(|t| t.circuit.clone())
    }
}

impl Connector for MockScheduler {
    type Channel = MockChannel;

    fn open(&self) -> QosResult<MockChannel> {
        let mut s = self.lock();
        if s.refuse_open {
            return Err(QosError::OpenFailed {
                path: ffi::QUANTUM_DEV_PATH.into(),
                source: io::Error::from_raw_os_error(libc::EACCES),
            });
        }
        s.opens += 1;
        Ok(MockChannel {
            state: Arc::clone(&self.state),
            pending_reply: None,
        })
    }
}

/// One open session on a [`MockScheduler`].
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
    pending_reply: Option<i32>,
}

impl MockChannel {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

fn read_qid(arg: &[u8]) -> io::Result<i32> {
    arg.get(..4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_ne_bytes)
        .ok_or_else(|| errno(libc::EINVAL))
}

impl Channel for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let reply = {
            let mut s = self.lock();
            let accepted = s.write_limit.map_or(buf.len(), |limit| buf.len().min(limit));
            s.submissions.push(buf[..accepted].to_vec());
            if accepted < buf.len() {
                return Ok(accepted);
            }

            let header_end = buf
                .iter()
                .position(|b| *b == b'\n')
                .ok_or_else(|| errno(libc::EINVAL))?;
            let raw = s.next_qid;
            s.next_qid += 1;
            let mut task = MockTask::new(TaskState::Received);
            task.circuit = buf[header_end + 1..].to_vec();
            s.tasks.insert(raw, task);
            s.reply_override.unwrap_or(raw)
        };

        self.pending_reply = Some(reply);
        Ok(buf.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reply = self.pending_reply.take().ok_or_else(|| errno(libc::EAGAIN))?;
        let bytes = reply.to_ne_bytes();
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn control(&mut self, request: ControlRequest, arg: &mut [u8]) -> io::Result<()> {
        let mut s = self.lock();
        s.exchanges.push(request);
        if let Some(code) = s.faults.remove(&request) {
            return Err(errno(code));
        }
        if arg.len() != request.record_size() {
            return Err(errno(libc::EINVAL));
        }

        match request {
            ControlRequest::Status => {
                let qid = read_qid(arg)?;
                let task = s.tasks.get_mut(&qid).ok_or_else(|| errno(ERRNO_NOT_FOUND))?;
                if let Some(next) = task.script.pop_front() {
                    task.current = next;
                }
                match task.current {
                    StatusReading::State(state) => {
                        arg[4..8].copy_from_slice(&state.as_raw().to_ne_bytes());
                        Ok(())
                    }
                    StatusReading::Missing => Err(errno(ERRNO_NOT_FOUND)),
                    StatusReading::Errno(code) => Err(errno(code)),
                }
            }
            ControlRequest::Cancel => {
                let qid = read_qid(arg)?;
                let task = s.tasks.get_mut(&qid).ok_or_else(|| errno(ERRNO_NOT_FOUND))?;
                match task.current {
                    StatusReading::State(TaskState::Received | TaskState::Queued) => {
                        task.script.clear();
                        task.current = StatusReading::State(TaskState::Cancelled);
                        Ok(())
                    }
                    StatusReading::State(TaskState::Running | TaskState::Merging) => {
                        Err(errno(ERRNO_NOT_CANCELLABLE))
                    }
                    StatusReading::Missing => Err(errno(ERRNO_NOT_FOUND)),
                    _ => Err(errno(libc::EINVAL)),
                }
            }
            ControlRequest::Result => {
                let qid = read_qid(arg)?;
                let task = s.tasks.get(&qid).ok_or_else(|| errno(ERRNO_NOT_FOUND))?;
                let mut record = *task.result;
                record.qid = qid;
                arg.copy_from_slice(record.as_bytes());
                Ok(())
            }
            ControlRequest::Resource => {
                arg.copy_from_slice(s.pool.as_bytes());
                Ok(())
            }
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        self.lock().closes += 1;
    }
}

/// A [`Sleeper`] that records requested sleeps instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested sleeps, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested sleeps.
    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
