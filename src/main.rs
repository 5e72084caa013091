//! binminer CLI: the batch mining driver plus the hidden worker mode
//! the driver spawns for process isolation.

use anyhow::Context;
use binminer::{
    analyzer, logging, Driver, ErrorLedger, MatchPolicy, OutputLayout, ProcessRunner, RunConfig,
    StopFlag, WorkerReport,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Map;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "binminer",
    version,
    about = "Resumable batch feature mining over binary corpora"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mine every artifact in the input folder.
    Mine(MineArgs),
    /// Internal: analyze a single artifact in an isolated process.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args)]
struct MineArgs {
    /// Folder containing the artifacts to mine.
    #[arg(short, long = "input-folder")]
    input: PathBuf,

    /// Folder that receives one directory per artifact. Must exist.
    #[arg(short, long = "output-folder")]
    output: PathBuf,

    /// JSON file merged verbatim into every feature document.
    #[arg(long)]
    hard: Option<PathBuf>,

    /// Per-artifact timeout budget in seconds.
    #[arg(short = 't', long = "time")]
    time: Option<u64>,

    /// Quarantine mode: record failing artifacts in the ledger and
    /// discard their output.
    #[arg(short, long)]
    discard: bool,

    /// Skip the non-static analysis pass.
    #[arg(long = "only-static")]
    only_static: bool,

    /// Ledger file used in quarantine mode.
    #[arg(long, default_value = "errors.txt")]
    ledger: PathBuf,

    /// Test ledger membership by exact artifact name instead of
    /// substring containment.
    #[arg(long)]
    exact_ledger: bool,
}

#[derive(Args)]
struct WorkerArgs {
    #[arg(long)]
    artifact: PathBuf,
    #[arg(long)]
    dest: PathBuf,
    #[arg(long)]
    hardcode: Option<String>,
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long = "only-static")]
    only_static: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Mine(args) => mine(args).await,
        Command::Worker(args) => worker(args),
    }
}

async fn mine(args: MineArgs) -> anyhow::Result<()> {
    logging::init_from_env();

    if args.only_static && !confirm_static_only()? {
        return Ok(());
    }

    // Setup validation aborts before any artifact is touched.
    let layout = OutputLayout::open_existing(&args.output)?;
    // The ledger owns the matching policy; nothing else re-states it.
    let match_policy = if args.exact_ledger {
        MatchPolicy::ExactName
    } else {
        MatchPolicy::Substring
    };
    let mut config = RunConfig {
        timeout: args.time.map(Duration::from_secs),
        static_only: args.only_static,
        quarantine: args.discard,
        hardcode: Map::new(),
    };
    if let Some(path) = &args.hard {
        config.hardcode = RunConfig::load_hardcode(path)?;
        info!(hardcode = ?config.hardcode, "dictionary to hardcode");
    }

    let ledger = ErrorLedger::load(&args.ledger, match_policy)?;

    let stop = StopFlag::new();
    stop.install()
        .context("installing the stop-flag signal handler")?;

    let runner = ProcessRunner::from_current_exe()?;
    let mut driver = Driver::new(layout, ledger, runner, stop, config);
    let stats = driver.run(&args.input).await?;

    info!(done = stats.done, failed = stats.failed, "all artifacts resolved");
    // Per-item failures never turn into a nonzero exit for the run.
    Ok(())
}

/// One-shot pre-flight gate before a static-only run starts.
fn confirm_static_only() -> anyhow::Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Execute only with static analysis?")
        .default(false)
        .interact()?;
    if !confirmed {
        info!("static-only run declined; exiting");
    }
    Ok(confirmed)
}

/// Worker mode: run the analyzer for one artifact and print exactly
/// one report line on stdout. A caught analysis fault still reports
/// `{error: true}` and exits 0; only an uncaught death leaves the
/// parent without a report.
fn worker(args: WorkerArgs) -> anyhow::Result<()> {
    logging::init_from_env();

    let hardcode: Map<_, _> = match args.hardcode.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("hardcode blob from the driver")?,
        None => Map::new(),
    };

    let report = match analyzer::extract(
        &args.artifact,
        &args.dest,
        &hardcode,
        args.timeout,
        args.only_static,
    ) {
        Ok(extraction) => WorkerReport {
            error: extraction.error,
            keys: Some(extraction.keys),
        },
        Err(e) => {
            error!(error = %e, "analysis fault caught in the worker");
            WorkerReport {
                error: true,
                keys: None,
            }
        }
    };

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
