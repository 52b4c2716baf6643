// SPDX-License-Identifier: Apache-2.0
//! Run command implementation.
//!
//! Submit a circuit, optionally waiting for and printing its result.

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use qos_client::{
    AllocStrategy, Connector, ErrorMitigation, QosClient, Sleeper, SplitStrategy, SubmissionConfig,
};

use super::common::{format_result_table, load_circuit, require_success, wait_for_result};

/// Where the circuit text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitSource {
    File(PathBuf),
    Inline(String),
}

impl CircuitSource {
    /// Pick the source from the mutually exclusive `FILE` and `--expr`.
    pub fn from_args(file: Option<PathBuf>, expr: Option<String>) -> Result<Self> {
        match (file, expr) {
            (None, Some(expr)) => Ok(CircuitSource::Inline(expr)),
            (Some(path), None) => Ok(CircuitSource::File(path)),
            (Some(_), Some(_)) => anyhow::bail!("Give either a circuit file or --expr, not both"),
            (None, None) => anyhow::bail!("No circuit given: pass a file or --expr"),
        }
    }

    fn load(&self) -> Result<String> {
        match self {
            CircuitSource::File(path) => load_circuit(path),
            CircuitSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Submission and wait options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub shots: u32,
    pub priority: i32,
    pub mitigation: ErrorMitigation,
    pub alloc: AllocStrategy,
    pub split: SplitStrategy,
    pub wait: bool,
    pub timeout: u64,
}

impl RunOptions {
    fn submission_config(&self) -> SubmissionConfig {
        SubmissionConfig::default()
            .with_shots(self.shots)
            .with_priority(self.priority)
            .with_error_mitigation(self.mitigation)
            .with_alloc_strategy(self.alloc)
            .with_split_strategy(self.split)
    }
}

/// Execute the run command.
pub fn execute<C: Connector, S: Sleeper>(
    client: &QosClient<C, S>,
    source: &CircuitSource,
    options: &RunOptions,
) -> Result<()> {
    let circuit = source.load()?;
    let config = options.submission_config();

    let qid = client.submit(&circuit, Some(&config))?;
    println!(
        "{} submitted: qid={}  shots={}  priority={}",
        style("✓").green().bold(),
        style(qid).bold(),
        config.shots,
        config.priority
    );

    if !options.wait {
        return Ok(());
    }

    let record = require_success(wait_for_result(client, qid, options.timeout)?)?;
    print!("{}", format_result_table(&record));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qos_client::TaskHandle;
    use qos_client::mock::{MockScheduler, RecordingSleeper};

    fn options(wait: bool) -> RunOptions {
        RunOptions {
            shots: 500,
            priority: 2,
            mitigation: ErrorMitigation::Mem,
            alloc: AllocStrategy::Topo,
            split: SplitStrategy::SpaceProb,
            wait,
            timeout: 5,
        }
    }

    #[test]
    fn test_source_from_args() {
        assert_eq!(
            CircuitSource::from_args(None, Some("x".into())).unwrap(),
            CircuitSource::Inline("x".into())
        );
        assert!(CircuitSource::from_args(None, None).is_err());
        assert!(CircuitSource::from_args(Some("a.qasm".into()), Some("x".into())).is_err());
    }

    #[test]
    fn test_run_submits_with_options() {
        let sched = MockScheduler::new();
        let client = QosClient::new(sched.clone()).with_sleeper(RecordingSleeper::new());

        execute(
            &client,
            &CircuitSource::Inline("OPENQASM 2.0;\n".into()),
            &options(false),
        )
        .unwrap();

        let sent = sched.submissions();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with(
            b"shots=500 priority=2 mitigation=1 alloc_strategy=3 split_strategy=3\n"
        ));
    }

    #[test]
    fn test_run_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.qasm");
        std::fs::write(&path, "OPENQASM 2.0;\nqreg q[2];\n").unwrap();

        let sched = MockScheduler::new();
        let client = QosClient::new(sched.clone()).with_sleeper(RecordingSleeper::new());
        execute(&client, &CircuitSource::File(path), &options(false)).unwrap();

        let qid = TaskHandle::new(1).unwrap();
        assert_eq!(sched.circuit(qid).unwrap(), b"OPENQASM 2.0;\nqreg q[2];\n");
    }

    #[test]
    fn test_run_wait_times_out_on_stuck_task() {
        let sched = MockScheduler::new();
        let sleeper = RecordingSleeper::new();
        let client = QosClient::new(sched.clone()).with_sleeper(sleeper.clone());

        // the submitted task stays RECEIVED
        let err = execute(
            &client,
            &CircuitSource::Inline("OPENQASM 2.0;\n".into()),
            &RunOptions {
                timeout: 1,
                ..options(true)
            },
        )
        .unwrap_err();

        assert!(err.to_string().contains("timeout"));
        assert!(sleeper.total() >= std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_run_missing_file_does_not_submit() {
        let sched = MockScheduler::new();
        let client = QosClient::new(sched.clone());
        let err = execute(
            &client,
            &CircuitSource::File("/nonexistent/bell.qasm".into()),
            &options(false),
        )
        .unwrap_err();
        assert!(err.to_string().contains("File not found"));
        assert_eq!(sched.opens(), 0);
    }
}
