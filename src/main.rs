use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use localnet_core::reference_vm::{ReferenceVm, VmMessage};
use localnet_core::*;
use serde::{Deserialize, Serialize};

const DEFAULT_GIVER_BALANCE: u64 = 5_000_000_000_000;

#[derive(Parser)]
#[command(name = "localnet-cli")]
#[command(about = "Local ledger simulator: run message scenarios against the reference VM")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every message of a scenario file and print the resulting transactions
    Run {
        /// JSON scenario: { "giver_balance": ..., "messages": [...] }
        #[arg(short, long)]
        scenario: PathBuf,

        /// Engine config (JSON). Defaults to a reference VM genesis
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fixed simulated time in unix milliseconds (system time if omitted)
        #[arg(long)]
        now: Option<u64>,
    },

    /// Parse raw VM trace text and print the steps as JSON
    ParseTrace {
        /// File holding the raw trace text
        file: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    giver_balance: Option<u64>,
    messages: Vec<VmMessage>,
}

#[derive(Debug, Serialize)]
struct TransactionSummary {
    hash: String,
    account: Option<String>,
    lt: u64,
    now: u32,
    aborted: bool,
    in_message: String,
    out_messages: usize,
    events: usize,
    trace_steps: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    submitted: Vec<String>,
    transactions: Vec<TransactionSummary>,
    accounts: usize,
    state_root: String,
}

fn main() {
    let _ = env_logger::try_init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { scenario, config, now } => handle_run(scenario, config, now),
        Commands::ParseTrace { file } => handle_parse_trace(file),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn handle_run(scenario_path: PathBuf, config_path: Option<PathBuf>, now: Option<u64>) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&scenario_path)
        .with_context(|| format!("cannot read scenario {}", scenario_path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw).context("invalid scenario")?;

    let config = match config_path {
        Some(path) => EngineConfig::from_file(&path)?,
        None => {
            let balance = scenario.giver_balance.unwrap_or(DEFAULT_GIVER_BALANCE);
            EngineConfig::new(ChainConfig::default(), ReferenceVm::genesis(balance)?)
        }
    };

    let clock: Arc<dyn Clock> = match now {
        Some(ms) => Arc::new(FixedClock::new(ms)),
        None => Arc::new(SystemClock),
    };
    let network = LocalNetwork::new(config, Arc::new(ReferenceVm::new()))?;
    let transport = network.connect(clock)?;

    let mut submitted = Vec::with_capacity(scenario.messages.len());
    for message in &scenario.messages {
        let boc = message.encode()?;
        submitted.push(transport.send_message(&boc)?);
    }

    let executor = network.executor();
    let transactions = executor
        .transactions()
        .into_iter()
        .map(|tx| TransactionSummary {
            trace_steps: network.tx_trace(&tx.hash).map(|steps| steps.len()),
            account: tx.account().cloned(),
            out_messages: tx.internal_messages().count(),
            events: tx.events().count(),
            in_message: tx.in_message.hash.clone(),
            hash: tx.hash,
            lt: tx.lt,
            now: tx.now,
            aborted: tx.aborted,
        })
        .collect();

    let report = RunReport {
        submitted,
        transactions,
        accounts: executor.get_accounts().len(),
        state_root: executor.state_root(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_parse_trace(file: PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read trace {}", file.display()))?;
    let steps = parse_trace(&raw);
    println!("{}", serde_json::to_string_pretty(&steps)?);
    Ok(())
}
