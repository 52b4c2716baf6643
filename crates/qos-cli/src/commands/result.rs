// SPDX-License-Identifier: Apache-2.0
//! Result command implementation.
//!
//! Wait for a task to terminate and print its result. A task the scheduler
//! reports as `FAILED` prints the scheduler's error and fails the command.

use anyhow::Result;
use console::style;

use qos_client::{Connector, QosClient, Sleeper};

use super::common::{
    format_histogram, format_result_table, parse_qid, require_success, to_json, wait_for_result,
};

/// How to render a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Histogram,
    Json,
}

/// Execute the result command.
pub fn execute<C: Connector, S: Sleeper>(
    client: &QosClient<C, S>,
    qid: i32,
    timeout: u64,
    format: OutputFormat,
) -> Result<()> {
    let qid = parse_qid(qid)?;

    if format != OutputFormat::Json {
        println!(
            "{} Fetching result for qid={} (timeout={}s)",
            style("→").cyan().bold(),
            qid,
            timeout
        );
    }

    let record = require_success(wait_for_result(client, qid, timeout)?)?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&record)?),
        OutputFormat::Histogram => print!("{}", format_histogram(&record)),
        OutputFormat::Table => print!("{}", format_result_table(&record)),
    }

    Ok(())
}
