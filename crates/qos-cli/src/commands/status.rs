// SPDX-License-Identifier: Apache-2.0
//! Status command implementation.
//!
//! Query the state of one task, or show every backend with `--all`.

use anyhow::Result;

use qos_client::{Connector, QosClient, Sleeper, TaskHandle, TaskState};

use super::common::{format_backend_table, parse_qid, styled_state, to_json};

/// Execute the status command.
pub fn execute<C: Connector, S: Sleeper>(
    client: &QosClient<C, S>,
    qid: Option<i32>,
    all: bool,
    json: bool,
) -> Result<()> {
    if all {
        let pool = client.resource()?;
        if json {
            println!("{}", to_json(&pool)?);
        } else {
            print!("{}", format_backend_table(&pool));
        }
        return Ok(());
    }

    let raw = qid.ok_or_else(|| anyhow::anyhow!("Please provide a qid or use --all"))?;
    let qid = parse_qid(raw)?;
    let state = client.status(qid)?;

    if json {
        println!("{}", status_json(qid, state));
    } else {
        println!("qid={:<6}  state={}", qid.get(), styled_state(state));
    }

    Ok(())
}

fn status_json(qid: TaskHandle, state: TaskState) -> serde_json::Value {
    serde_json::json!({
        "qid": qid,
        "state": state.as_raw(),
        "state_str": state.name(),
    })
}
