// SPDX-License-Identifier: Apache-2.0
//! Resource command implementation.

use anyhow::Result;
use console::style;

use qos_client::{Connector, QosClient, Sleeper};

use super::common::{format_backend_table, to_json};

/// Execute the resource command.
pub fn execute<C: Connector, S: Sleeper>(client: &QosClient<C, S>, json: bool) -> Result<()> {
    let pool = client.resource()?;

    if json {
        println!("{}", to_json(&pool)?);
        return Ok(());
    }

    println!(
        "{} QuantumOS backend pool ({} backends, {} idle, {} qubits available)\n",
        style("→").cyan().bold(),
        pool.len(),
        pool.idle_count(),
        pool.available_qubits()
    );
    if pool.is_empty() {
        println!("No backends registered.");
        return Ok(());
    }
    print!("{}", format_backend_table(&pool));

    Ok(())
}
