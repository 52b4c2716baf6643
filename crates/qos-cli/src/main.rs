// SPDX-License-Identifier: Apache-2.0
//! QuantumOS command-line tools.
//!
//! One binary, one subcommand per operation of the kernel scheduler:
//!
//! ```text
//!   qos run [-s SHOTS] [-p PRIO] [-w] bell.qasm     submit (and wait)
//!   qos status <QID> | --all                        task state or backend table
//!   qos result <QID> [TIMEOUT]                      wait for and print a result
//!   qos resource                                    backend pool snapshot
//!   qos cancel <QID>                                cancel a queued task
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use qos_client::{AllocStrategy, ClientConfig, ErrorMitigation, QosClient, SplitStrategy};

mod commands;

use commands::{cancel, resource, result, run, status};

/// Client tools for the QuantumOS quantum task scheduler
#[derive(Parser)]
#[command(name = "qos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Scheduler device [default: $QOS_DEVICE, else /dev/quantum]
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a circuit
    Run {
        /// Circuit file (OpenQASM)
        #[arg(required_unless_present = "expr", conflicts_with = "expr")]
        file: Option<PathBuf>,

        /// Inline circuit text
        #[arg(short, long)]
        expr: Option<String>,

        /// Number of shots
        #[arg(short, long, default_value = "1000")]
        shots: u32,

        /// Scheduling priority
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        priority: i32,

        /// Error mitigation method
        #[arg(long, value_enum, default_value = "none")]
        mitigation: MitigationArg,

        /// Backend allocation strategy
        #[arg(long, value_enum, default_value = "first-fit")]
        alloc: AllocArg,

        /// Circuit splitting strategy
        #[arg(long, value_enum, default_value = "none")]
        split: SplitArg,

        /// Wait for the result after submitting
        #[arg(short, long)]
        wait: bool,

        /// Wait budget in seconds (0 = default)
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },

    /// Query task state, or the backend pool with --all
    Status {
        /// Task ID
        #[arg(required_unless_present = "all", allow_negative_numbers = true)]
        qid: Option<i32>,

        /// Show all backends instead of a task
        #[arg(short, long)]
        all: bool,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Wait for a task and print its result
    Result {
        /// Task ID
        #[arg(allow_negative_numbers = true)]
        qid: i32,

        /// Wait budget in seconds (0 = default)
        #[arg(default_value = "30")]
        timeout: u64,

        /// JSON output
        #[arg(long, conflicts_with = "histogram")]
        json: bool,

        /// ASCII histogram output
        #[arg(long)]
        histogram: bool,
    },

    /// Show the backend pool
    Resource {
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Cancel a task that has not started running
    Cancel {
        /// Task ID
        #[arg(allow_negative_numbers = true)]
        qid: i32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MitigationArg {
    None,
    Mem,
    Cdr,
    Pec,
}

impl From<MitigationArg> for ErrorMitigation {
    fn from(arg: MitigationArg) -> Self {
        match arg {
            MitigationArg::None => ErrorMitigation::None,
            MitigationArg::Mem => ErrorMitigation::Mem,
            MitigationArg::Cdr => ErrorMitigation::Cdr,
            MitigationArg::Pec => ErrorMitigation::Pec,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AllocArg {
    FirstFit,
    Fidelity,
    Regression,
    Topo,
}

impl From<AllocArg> for AllocStrategy {
    fn from(arg: AllocArg) -> Self {
        match arg {
            AllocArg::FirstFit => AllocStrategy::FirstFit,
            AllocArg::Fidelity => AllocStrategy::Fidelity,
            AllocArg::Regression => AllocStrategy::Regression,
            AllocArg::Topo => AllocStrategy::Topo,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SplitArg {
    None,
    SpaceNaive,
    Time,
    SpaceProb,
    TopoAware,
}

impl From<SplitArg> for SplitStrategy {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::None => SplitStrategy::None,
            SplitArg::SpaceNaive => SplitStrategy::SpaceNaive,
            SplitArg::Time => SplitStrategy::Time,
            SplitArg::SpaceProb => SplitStrategy::SpaceProb,
            SplitArg::TopoAware => SplitStrategy::TopoAware,
        }
    }
}

/// `--device` wins over the environment, which wins over the default.
fn resolve_config(from_env: ClientConfig, device: Option<PathBuf>) -> ClientConfig {
    match device {
        Some(device) => from_env.with_device_path(device),
        None => from_env,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(ClientConfig::from_env(), cli.device);
    tracing::debug!("using device {}", config.device_path.display());
    let client = QosClient::from_config(&config);

    let result = match cli.command {
        Commands::Run {
            file,
            expr,
            shots,
            priority,
            mitigation,
            alloc,
            split,
            wait,
            timeout,
        } => {
            let options = run::RunOptions {
                shots,
                priority,
                mitigation: mitigation.into(),
                alloc: alloc.into(),
                split: split.into(),
                wait,
                timeout,
            };
            run::CircuitSource::from_args(file, expr)
                .and_then(|source| run::execute(&client, &source, &options))
        }

        Commands::Status { qid, all, json } => status::execute(&client, qid, all, json),

        Commands::Result {
            qid,
            timeout,
            json,
            histogram,
        } => {
            let format = if json {
                result::OutputFormat::Json
            } else if histogram {
                result::OutputFormat::Histogram
            } else {
                result::OutputFormat::Table
            };
            result::execute(&client, qid, timeout, format)
        }

        Commands::Resource { json } => resource::execute(&client, json),

        Commands::Cancel { qid } => cancel::execute(&client, qid),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
