// SPDX-License-Identifier: Apache-2.0
//! High-level client.

use std::time::Duration;

use crate::backend::BackendPool;
use crate::config::ClientConfig;
use crate::control;
use crate::error::QosResult;
use crate::poller::{self, PollPolicy, Sleeper, ThreadSleeper};
use crate::result::ResultRecord;
use crate::session::{Connector, DeviceConnector};
use crate::submit;
use crate::task::{SubmissionConfig, TaskHandle, TaskState};

/// Client for the kernel scheduler.
///
/// Holds no open handle: every call opens its own session and closes it
/// before returning, so a client can be shared freely between threads when
/// its connector and sleeper allow it.
///
/// # Example
///
/// ```no_run
/// use qos_client::QosClient;
/// use std::time::Duration;
///
/// let client = QosClient::device();
/// let qid = client.submit("OPENQASM 2.0;\nqreg q[1];\n", None)?;
/// let record = client.await_result(qid, Duration::from_secs(10))?;
/// println!("{} outcomes", record.outcomes.len());
/// # Ok::<(), qos_client::QosError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QosClient<C = DeviceConnector, S = ThreadSleeper> {
    connector: C,
    sleeper: S,
    policy: PollPolicy,
}

impl QosClient {
    /// Client for the default device with the default poll policy.
    pub fn device() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        QosClient::new(DeviceConnector::new(config.device_path.clone()))
            .with_policy(config.poll.clone())
    }
}

impl<C: Connector> QosClient<C> {
    /// Client over an arbitrary connector, sleeping on the calling thread.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sleeper: ThreadSleeper,
            policy: PollPolicy::default(),
        }
    }
}

impl<C: Connector, S: Sleeper> QosClient<C, S> {
    /// Replace the sleeper used between polls.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> QosClient<C, S2> {
        QosClient {
            connector: self.connector,
            sleeper,
            policy: self.policy,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit a circuit. `None` uses [`SubmissionConfig::default`].
    pub fn submit(&self, circuit: &str, config: Option<&SubmissionConfig>) -> QosResult<TaskHandle> {
        let default = SubmissionConfig::default();
        submit::submit(&self.connector, circuit, config.unwrap_or(&default))
    }

    /// Current state of a task. Unknown tasks read as [`TaskState::Unknown`].
    pub fn status(&self, qid: TaskHandle) -> QosResult<TaskState> {
        control::status(&self.connector, qid)
    }

    /// Cancel a task that has not started executing.
    pub fn cancel(&self, qid: TaskHandle) -> QosResult<()> {
        control::cancel(&self.connector, qid)
    }

    /// Fetch the result of a task without polling. The record's
    /// `final_state` is `Success`.
    pub fn fetch_result(&self, qid: TaskHandle) -> QosResult<ResultRecord> {
        control::fetch_result(&self.connector, qid, TaskState::Success)
    }

    /// Snapshot of the backend pool.
    pub fn resource(&self) -> QosResult<BackendPool> {
        control::resource(&self.connector)
    }

    /// Block until the task terminates and return its result. A zero
    /// `timeout` uses the policy's default budget.
    pub fn await_result(&self, qid: TaskHandle, timeout: Duration) -> QosResult<ResultRecord> {
        poller::await_result(&self.connector, &self.sleeper, &self.policy, qid, timeout)
    }

    /// Submit and wait in one call.
    pub fn run(
        &self,
        circuit: &str,
        config: Option<&SubmissionConfig>,
        timeout: Duration,
    ) -> QosResult<ResultRecord> {
        let qid = self.submit(circuit, config)?;
        self.await_result(qid, timeout)
    }
}
