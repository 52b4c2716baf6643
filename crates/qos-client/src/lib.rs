// SPDX-License-Identifier: Apache-2.0
//! Client library for the QuantumOS kernel scheduler.
//!
//! The scheduler lives in the kernel and is reached through a character
//! device (`/dev/quantum` by default). Circuits go in with a single write,
//! everything else is a fixed-shape control exchange. This crate wraps that
//! protocol in typed, synchronous calls.
//!
//! # Overview
//!
//! - [`QosClient`] bundles every operation behind one value
//! - [`submit`](submit::submit) encodes a circuit and its [`SubmissionConfig`]
//! - [`control`] holds the status, cancel, result and resource exchanges
//! - [`poller::await_result`] waits for a task with bounded backoff
//! - `mock::MockScheduler` speaks the protocol in memory, for tests (behind
//!   the `mock` feature)
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "mock")]
//! # fn main() -> Result<(), qos_client::QosError> {
//! use qos_client::mock::{MockScheduler, RecordingSleeper};
//! use qos_client::{QosClient, SubmissionConfig, TaskState};
//! use std::time::Duration;
//!
//! let scheduler = MockScheduler::new();
//! let client = QosClient::new(scheduler.clone()).with_sleeper(RecordingSleeper::new());
//!
//! let config = SubmissionConfig::default().with_shots(100);
//! let qid = client.submit("OPENQASM 2.0;\nqreg q[1];\n", Some(&config))?;
//!
//! scheduler.script_status(qid, [TaskState::Queued, TaskState::Running, TaskState::Success]);
//! scheduler.set_result(qid, 100, &[("0", 52), ("1", 48)]);
//!
//! let record = client.await_result(qid, Duration::from_secs(5))?;
//! assert_eq!(record.total_count(), 100);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "mock"))]
//! # fn main() {}
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod control;
pub mod decode;
pub mod error;
pub mod ffi;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod poller;
pub mod result;
pub mod session;
pub mod submit;
pub mod task;

pub use backend::{BackendDescriptor, BackendPool, BackendState};
pub use client::QosClient;
pub use config::ClientConfig;
pub use error::{QosError, QosResult};
pub use poller::{PollPolicy, Sleeper, ThreadSleeper};
pub use result::{Outcome, ResultRecord};
pub use session::{Channel, Connector, ControlRequest, DeviceConnector, DeviceSession};
pub use task::{
    AllocStrategy, ErrorMitigation, SplitStrategy, SubmissionConfig, TaskHandle, TaskState,
};
