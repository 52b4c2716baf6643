// SPDX-License-Identifier: Apache-2.0
//! Decoded execution results.

use serde::{Deserialize, Serialize};

use crate::error::{QosError, QosResult};
use crate::task::{TaskHandle, TaskState};

/// One measured bitstring and how often it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Measured bitstring, at most 191 bytes.
    pub bitstring: String,
    pub count: u32,
}

impl Outcome {
    pub fn new(bitstring: impl Into<String>, count: u32) -> Self {
        Self {
            bitstring: bitstring.into(),
            count,
        }
    }
}

/// Result of a task as reported by the scheduler.
///
/// `shots` comes from the scheduler and is not guaranteed to equal the sum of
/// the outcome counts (mitigation and split recombination may adjust counts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub qid: TaskHandle,
    /// Terminal state observed before the fetch (`Success` or `Failed`).
    pub final_state: TaskState,
    pub shots: u32,
    /// At most 32 outcomes, in scheduler order.
    pub outcomes: Vec<Outcome>,
    pub error_code: i32,
    /// Scheduler error message, at most 127 bytes.
    pub error_info: String,
    pub fidelity_score: i32,
    pub num_sub_circuits: i32,
}

impl ResultRecord {
    /// Sum of all outcome counts.
    pub fn total_count(&self) -> u64 {
        self.outcomes.iter().map(|o| u64::from(o.count)).sum()
    }

    /// The most frequently observed outcome.
    pub fn most_frequent(&self) -> Option<&Outcome> {
        self.outcomes.iter().max_by_key(|o| o.count)
    }

    /// Share of the observed counts for one outcome, in `[0, 1]`.
    pub fn probability(&self, outcome: &Outcome) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        f64::from(outcome.count) / total as f64
    }

    /// Outcomes ordered by descending count.
    pub fn sorted_outcomes(&self) -> Vec<&Outcome> {
        let mut sorted: Vec<&Outcome> = self.outcomes.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    /// Whether the scheduler reported the task as failed.
    pub fn is_failure(&self) -> bool {
        self.final_state == TaskState::Failed
    }

    /// Treat a scheduler-reported failure as an error.
    pub fn into_success(self) -> QosResult<Self> {
        if self.is_failure() {
            return Err(QosError::SchedulerReportedFailure {
                qid: self.qid,
                code: self.error_code,
                info: self.error_info,
            });
        }
        Ok(self)
    }
}
