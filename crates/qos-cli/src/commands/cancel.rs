// SPDX-License-Identifier: Apache-2.0
//! Cancel command implementation.

use anyhow::Result;
use console::style;

use qos_client::{Connector, QosClient, QosError, Sleeper};

use super::common::parse_qid;

/// Execute the cancel command.
pub fn execute<C: Connector, S: Sleeper>(client: &QosClient<C, S>, qid: i32) -> Result<()> {
    let qid = parse_qid(qid)?;

    match client.cancel(qid) {
        Ok(()) => {
            println!("{} cancelled: qid={}", style("✓").green().bold(), qid);
            Ok(())
        }
        Err(e @ QosError::NotCancellable(_)) => Err(anyhow::Error::new(e)
            .context(format!("Cannot cancel qid={qid}; wait for it with 'qos result {qid}'"))),
        Err(e @ QosError::NotFound(_)) => Err(anyhow::Error::new(e).context(format!(
            "No task with qid={qid}; it may have finished and been reaped"
        ))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qos_client::TaskState;
    use qos_client::mock::MockScheduler;

    #[test]
    fn test_cancel_queued() {
        let sched = MockScheduler::new();
        let qid = sched.add_task(TaskState::Queued);
        let client = QosClient::new(sched.clone());

        execute(&client, qid.get()).unwrap();
        assert_eq!(client.status(qid).unwrap(), TaskState::Cancelled);
    }

    #[test]
    fn test_cancel_messages_are_distinct() {
        let sched = MockScheduler::new();
        let running = sched.add_task(TaskState::Running);
        let client = QosClient::new(sched);

        let busy = execute(&client, running.get()).unwrap_err();
        let missing = execute(&client, 500).unwrap_err();

        assert!(format!("{busy:#}").contains("cannot be cancelled"));
        assert!(format!("{missing:#}").contains("not found"));
        assert!(busy.downcast_ref::<QosError>().is_some());
        assert_ne!(busy.to_string(), missing.to_string());
    }
}
