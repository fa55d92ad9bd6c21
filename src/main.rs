use std::num::{NonZeroU64, NonZeroUsize};
use std::panic;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{ChainEndpoints, Endpoint, RunConfig, ToolCommand};
use crate::constants::DEFAULT_WORKER_COUNT;
use crate::core::pipeline::dispatching::{DispatchError, Dispatcher};
use crate::core::traits::{launcher::Launcher, sink::ResultSink};
use crate::dataset::DatasetError;
use crate::logparse::{
    LogError, ParsedLog, ToolKind,
    batch::{self, BatchError},
};
use crate::native::{launcher::NativeLauncher, sink::FileSink};
use crate::stubs::{launcher::LauncherStub, sink::MemorySink};

mod config;
mod constants;
mod core;
mod dataset;
mod logparse;
mod native;
mod stubs;

#[derive(Parser)]
#[command(name = "cagebench")]
#[command(about = "Benchmark harness for exploit generation tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tool against every target of a dataset
    Run(RunArgs),

    /// Extract (detected, time) from a tool log or a directory of logs
    Parse {
        #[arg(value_enum)]
        tool: ToolKind,

        /// Log file, or directory of log files
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// CSV with `target,base,pair,chain,blocknum` columns
    dataset: PathBuf,

    /// Time budget for each target, in seconds
    time_limit: NonZeroU64,

    /// Directory to store all results
    result_dir: PathBuf,

    /// Number of targets analyzed at once
    #[arg(short, long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: NonZeroUsize,

    #[arg(long, env = "ETH_RPC_URL", default_value = "")]
    eth_rpc_url: String,

    #[arg(long, env = "ETHERSCAN_API_KEY", default_value = "", hide_env_values = true)]
    etherscan_api_key: String,

    #[arg(long, env = "BSC_RPC_URL", default_value = "")]
    bsc_rpc_url: String,

    #[arg(long, env = "BSCSCAN_API_KEY", default_value = "", hide_env_values = true)]
    bscscan_api_key: String,

    /// Analysis tool executable
    #[arg(long, default_value = "forge")]
    forge_bin: PathBuf,

    /// Wrapper enforcing the tool's own timeout
    #[arg(long, default_value = "timeout")]
    timeout_bin: PathBuf,

    /// Fork every target at this block instead of one before its exploit
    #[arg(long)]
    fork_block: Option<u64>,

    /// Check the dataset and build every invocation without starting any process or writing results
    #[arg(long)]
    dry_run: bool,
}

impl From<&RunArgs> for RunConfig {
    fn from(args: &RunArgs) -> Self {
        RunConfig {
            time_limit: Duration::from_secs(args.time_limit.get()),
            worker_count: args.workers,
            result_dir: args.result_dir.clone(),
            endpoints: ChainEndpoints {
                eth: Endpoint {
                    rpc_url: args.eth_rpc_url.clone(),
                    api_key: args.etherscan_api_key.clone(),
                },
                bsc: Endpoint {
                    rpc_url: args.bsc_rpc_url.clone(),
                    api_key: args.bscscan_api_key.clone(),
                },
            },
            tool: ToolCommand {
                forge_bin: args.forge_bin.clone(),
                timeout_bin: args.timeout_bin.clone(),
            },
            fork_block_override: args.fork_block,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("{0} does not exist or is neither a file nor a directory")]
    NoSuchPath(String),
    #[error("interrupted, in-flight targets were killed")]
    Interrupted,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Parse { tool, path } => parse(tool, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let config = Arc::new(RunConfig::from(&args));
    tracing::info!("file_path: {}", args.dataset.display());
    tracing::info!("time_limit: {}", args.time_limit);

    let rows = dataset::read_dataset(&args.dataset).await?;
    tracing::info!("input parsed, {} rows", rows.len());

    if args.dry_run {
        let sink = Arc::new(MemorySink::new());
        Dispatcher::new(config, Arc::new(LauncherStub::dry_run()), sink.clone())
            .dispatch(rows)
            .await?;
        println!("dry run: {} targets checked", sink.outcomes().len());
        return Ok(());
    }

    let launcher: Arc<dyn Launcher> = Arc::new(NativeLauncher::new());
    let sink: Arc<dyn ResultSink> = Arc::new(FileSink::new(&config.result_dir));
    let dispatcher = Dispatcher::new(config, launcher, sink);
    // Losing the race drops every in-flight launch, which kills its process group.
    tokio::select! {
        result = dispatcher.dispatch(rows) => result?,
        _ = interrupted() => return Err(CliError::Interrupted),
    }
    println!("completed all tasks");
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn elapsed(parsed: &ParsedLog) -> String {
    match parsed.elapsed_secs {
        Some(secs) => secs.to_string(),
        None => "unresolved".to_string(),
    }
}

fn parse(tool: ToolKind, path: &Path) -> Result<(), CliError> {
    if path.is_file() {
        match logparse::parse(tool, path) {
            Ok(parsed) if parsed.detected => {
                println!("detected: true, seconds_to_bug: {}", elapsed(&parsed))
            }
            Ok(parsed) => println!("detected: false, execution_time: {}", elapsed(&parsed)),
            Err(e) if e.is_malformed() => {
                tracing::warn!("{}", e);
                println!("detected: false, execution_time: unresolved");
            }
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    if !path.is_dir() {
        return Err(CliError::NoSuchPath(path.display().to_string()));
    }

    let entries = batch::parse_dir(tool, path)?;
    for entry in &entries {
        if let Ok(parsed) = &entry.result {
            println!(
                "{}, {}, {}",
                entry.path.display(),
                parsed.detected,
                elapsed(parsed)
            );
        }
    }

    let summary = batch::summarize(&entries);
    let secs = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |s| format!("{s:.1}"));
    println!(
        "parsed: {}, malformed: {}, failed: {}, detected: {}, exhausted: {}, mean_seconds_to_bug: {}, median_seconds_to_bug: {}",
        summary.parsed,
        summary.malformed,
        summary.failed,
        summary.detected,
        summary.exhausted,
        secs(summary.mean_secs_to_bug),
        secs(summary.median_secs_to_bug)
    );
    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
