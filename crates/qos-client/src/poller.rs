// SPDX-License-Identifier: Apache-2.0
//! Result polling.
//!
//! The scheduler owns task state and mutates it concurrently with us. A task
//! that was split into sub-circuits can briefly read as `UNKNOWN` while the
//! kernel moves it between queues, so a single unknown reading is not proof
//! that the task is gone. The poller only gives up after
//! [`PollPolicy::unknown_threshold`] unknown readings in a row, and only an
//! unambiguous in-flight reading breaks such a run.

use std::thread;
use std::time::Duration;

use crate::control;
use crate::error::{QosError, QosResult};
use crate::result::ResultRecord;
use crate::session::Connector;
use crate::task::{TaskHandle, TaskState};

/// Blocks the calling thread between polls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Backoff and give-up parameters for [`await_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// First sleep between polls.
    pub initial_interval: Duration,
    /// Ceiling for the doubling backoff.
    pub max_interval: Duration,
    /// Consecutive unknown readings after which the task is declared gone.
    pub unknown_threshold: u32,
    /// Budget used when the caller passes a zero timeout.
    pub default_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            unknown_threshold: 3,
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    /// The interval following `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }

    /// The effective budget for a caller-supplied timeout.
    pub fn budget(&self, timeout: Duration) -> Duration {
        if timeout.is_zero() {
            self.default_timeout
        } else {
            timeout
        }
    }
}

/// Poll a task until it terminates, then fetch its result.
///
/// A `FAILED` task is a normal outcome: its record is returned with
/// `final_state == Failed`. A cancelled task, or one that keeps reading as
/// unknown, yields [`QosError::NotFound`]. Timing out does not cancel the
/// task.
///
/// Transport failures on a status exchange count as unknown readings. Failing
/// to open the device aborts immediately.
pub fn await_result<C, S>(
    connector: &C,
    sleeper: &S,
    policy: &PollPolicy,
    qid: TaskHandle,
    timeout: Duration,
) -> QosResult<ResultRecord>
where
    C: Connector,
    S: Sleeper + ?Sized,
{
    let budget = policy.budget(timeout);
    let mut interval = policy.initial_interval;
    let mut elapsed = Duration::ZERO;
    let mut unknown_streak = 0u32;
    let mut last_seen: Option<TaskState> = None;

    let final_state = loop {
        let state = match control::status(connector, qid) {
            Ok(state) => state,
            Err(err @ QosError::ControlExchangeFailed { .. }) => {
                tracing::debug!("task {}: {}; counting as unknown", qid, err);
                TaskState::Unknown
            }
            Err(err) => return Err(err),
        };

        tracing::trace!(
            "task {}: {} (elapsed {:?}, streak {})",
            qid,
            state,
            elapsed,
            unknown_streak
        );
        if last_seen != Some(state) {
            tracing::debug!("task {} is now {}", qid, state);
            last_seen = Some(state);
        }

        match state {
            TaskState::Success | TaskState::Failed => break state,
            TaskState::Cancelled => {
                tracing::warn!("task {} was cancelled", qid);
                return Err(QosError::NotFound(qid));
            }
            TaskState::Unknown => {
                unknown_streak += 1;
                if unknown_streak >= policy.unknown_threshold {
                    tracing::warn!(
                        "task {}: {} consecutive unknown readings, giving up",
                        qid,
                        unknown_streak
                    );
                    return Err(QosError::NotFound(qid));
                }
            }
            TaskState::Received | TaskState::Queued | TaskState::Running | TaskState::Merging => {
                unknown_streak = 0;
            }
        }

        if elapsed >= budget {
            tracing::warn!("task {}: no terminal state after {:?}", qid, elapsed);
            return Err(QosError::Timeout {
                qid,
                waited_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            });
        }

        sleeper.sleep(interval);
        elapsed += interval;
        interval = policy.next_interval(interval);
    };

    control::fetch_result(connector, qid, final_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockScheduler, RecordingSleeper, StatusReading};
    use crate::session::ControlRequest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_policy() {
        let p = PollPolicy::default();
        assert_eq!(p.initial_interval, ms(50));
        assert_eq!(p.max_interval, ms(500));
        assert_eq!(p.unknown_threshold, 3);
        assert_eq!(p.budget(Duration::ZERO), Duration::from_secs(30));
        assert_eq!(p.budget(ms(1200)), ms(1200));
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let p = PollPolicy::default();
        let mut interval = p.initial_interval;
        let mut seen = vec![interval];
        for _ in 0..6 {
            interval = p.next_interval(interval);
            seen.push(interval);
        }
        assert_eq!(
            seen,
            vec![ms(50), ms(100), ms(200), ms(400), ms(500), ms(500), ms(500)]
        );
    }

    #[test]
    fn test_immediate_success_does_not_sleep() {
        let sched = MockScheduler::new();
        let qid = sched.add_task(TaskState::Success);
        sched.set_result(qid, 100, &[("00", 60), ("11", 40)]);
        let sleeper = RecordingSleeper::new();

        let record =
            await_result(&sched, &sleeper, &PollPolicy::default(), qid, Duration::ZERO).unwrap();

        assert_eq!(record.final_state, TaskState::Success);
        assert_eq!(record.total_count(), 100);
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(sched.exchange_count(ControlRequest::Result), 1);
    }

    #[test]
    fn test_open_failure_is_not_absorbed() {
        let sched = MockScheduler::new();
        let qid = sched.add_task(TaskState::Running);
        sched.refuse_open(true);
        let sleeper = RecordingSleeper::new();

        let err = await_result(&sched, &sleeper, &PollPolicy::default(), qid, ms(1000))
            .unwrap_err();
        assert!(matches!(err, QosError::OpenFailed { .. }));
        assert!(sleeper.sleeps().is_empty());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let sched = MockScheduler::new();
        let qid = sched.add_task(TaskState::Queued);
        sched.script_status(qid, [StatusReading::Missing]);
        let sleeper = RecordingSleeper::new();
        let policy = PollPolicy {
            unknown_threshold: 5,
            ..PollPolicy::default()
        };

        let err = await_result(&sched, &sleeper, &policy, qid, Duration::ZERO).unwrap_err();
        assert!(matches!(err, QosError::NotFound(q) if q == qid));
        assert_eq!(sched.exchange_count(ControlRequest::Status), 5);
        assert_eq!(sleeper.sleeps().len(), 4);
    }
}
