// SPDX-License-Identifier: Apache-2.0
//! Shared helpers for CLI commands.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qos_client::{
    BackendPool, Connector, QosClient, ResultRecord, Sleeper, TaskHandle, TaskState,
};

/// Minimum width of the bitstring column.
const MIN_KEY_WIDTH: usize = 16;

/// Load circuit text from a file.
pub fn load_circuit(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Validate a task ID from the command line.
pub fn parse_qid(raw: i32) -> Result<TaskHandle> {
    TaskHandle::new(raw).with_context(|| format!("Invalid qid '{raw}'"))
}

/// Pretty-printed JSON for any serializable value.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Wait for a task behind a spinner.
pub fn wait_for_result<C: Connector, S: Sleeper>(
    client: &QosClient<C, S>,
    qid: TaskHandle,
    timeout_secs: u64,
) -> Result<ResultRecord> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!("Waiting for task {qid}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = client.await_result(qid, Duration::from_secs(timeout_secs));
    spinner.finish_and_clear();

    Ok(outcome?)
}

/// Turn a `FAILED` record into an error carrying the scheduler's message.
pub fn require_success(record: ResultRecord) -> Result<ResultRecord> {
    Ok(record.into_success()?)
}

/// Result table: one row per outcome in scheduler order.
pub fn format_result_table(record: &ResultRecord) -> String {
    let key_width = record
        .outcomes
        .iter()
        .map(|o| o.bitstring.len())
        .max()
        .unwrap_or(0)
        .max(MIN_KEY_WIDTH)
        + 2;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "qid={}  shots={}  outcomes={}",
        record.qid,
        record.shots,
        record.outcomes.len()
    );
    let _ = writeln!(out, "{:<key_width$}  {:>8}  {:>8}", "state", "count", "prob");
    let _ = writeln!(out, "{}", "─".repeat(key_width + 20));

    for outcome in &record.outcomes {
        let key = format!("|{}>", outcome.bitstring);
        let pct = record.probability(outcome) * 100.0;
        let _ = writeln!(out, "{key:<key_width$}  {:>8}  {pct:>7.1}%", outcome.count);
    }

    if record.num_sub_circuits > 1 {
        let _ = writeln!(out, "\nrecombined from {} sub-circuits", record.num_sub_circuits);
    }
    if record.fidelity_score > 0 {
        let _ = writeln!(out, "fidelity score: {}", record.fidelity_score);
    }
    out
}

/// Histogram: outcomes by descending count with a proportional bar.
pub fn format_histogram(record: &ResultRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "qid={}  shots={}  outcomes={}",
        record.qid,
        record.shots,
        record.outcomes.len()
    );

    let sorted = record.sorted_outcomes();
    let key_width = sorted.iter().map(|o| o.bitstring.len()).max().unwrap_or(0) + 2;
    for outcome in sorted {
        let pct = record.probability(outcome) * 100.0;
        let bar = "█".repeat((pct / 2.0).round() as usize);
        let key = format!("|{}>", outcome.bitstring);
        let _ = writeln!(
            out,
            "{key:<key_width$}  {:>8} ({pct:>5.1}%) {bar}",
            outcome.count
        );
    }
    out
}

/// Backend table with fidelity and current task columns.
pub fn format_backend_table(pool: &BackendPool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12}  {:<6}  {:<12}  {:<9}  {:<8}  {}",
        "backend", "qubits", "state", "available", "fidelity", "current_qid"
    );
    let _ = writeln!(out, "{}", "─".repeat(66));

    for backend in pool {
        let fidelity = if backend.fidelity_score > 0 {
            backend.fidelity_score.to_string()
        } else {
            "-".to_string()
        };
        let current = backend
            .current_qid
            .map_or_else(|| "-".to_string(), |q| q.to_string());
        let _ = writeln!(
            out,
            "{:<12}  {:<6}  {:<12}  {:<9}  {:<8}  {}",
            backend.name,
            backend.total_qubits,
            backend.state.name(),
            backend.num_qubits_available,
            fidelity,
            current
        );
    }
    out
}

/// Task state, coloured by lifecycle phase.
pub fn styled_state(state: TaskState) -> console::StyledObject<&'static str> {
    let name = state.name();
    match state {
        TaskState::Success => style(name).green().bold(),
        TaskState::Failed | TaskState::Cancelled => style(name).red().bold(),
        TaskState::Received | TaskState::Queued => style(name).yellow().bold(),
        TaskState::Running | TaskState::Merging => style(name).cyan().bold(),
        TaskState::Unknown => style(name).dim(),
    }
}
