mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pkgsnap_lib::{Config, PackageConsole};
use tracing_subscriber::EnvFilter;

use cmd::{Console, JobCommand, SnapshotCommand};
use output::{OutputFormat, print_error};

/// pkgsnap - snapshot and restore the package set of a Python interpreter
#[derive(Parser)]
#[command(name = "pkgsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Python interpreter to manage (default: $PKGSNAP_PYTHON or python3)
  #[arg(long, global = true)]
  python: Option<PathBuf>,

  /// Directory for snapshots, job logs and the audit journal
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Kill any single operation running longer than this (e.g. "5m", "90s")
  #[arg(long, global = true, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List installed packages
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show interpreter and storage information
  Info {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Manage snapshots
  #[command(subcommand)]
  Snapshot(SnapshotCommand),

  /// Compare a snapshot with the live environment, or two snapshots
  Diff {
    /// Snapshot to compare
    snapshot: String,

    /// Second snapshot (compares snapshot → other instead of current → snapshot)
    other: Option<String>,

    /// Include unchanged packages
    #[arg(short, long)]
    all: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the operations a restore would run (dry-run)
  Plan {
    /// Snapshot to restore
    snapshot: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  #[command(flatten)]
  Job(JobCommand),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

fn load_config(cli: &Cli) -> Result<Config> {
  let mut config = Config::from_env()?;
  if let Some(python) = &cli.python {
    config.python = python.clone();
  }
  if let Some(data_dir) = &cli.data_dir {
    config.data_dir = data_dir.clone();
  }
  if let Some(timeout) = cli.timeout {
    config.operation_timeout = Some(timeout);
  }
  Ok(config)
}

fn run(cli: Cli) -> Result<()> {
  let config = load_config(&cli)?;

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .context("Failed to start async runtime")?;

  runtime.block_on(async move {
    let console: Console = PackageConsole::from_config(&config);
    dispatch(&console, &config, cli).await
  })
}

async fn dispatch(console: &Console, config: &Config, cli: Cli) -> Result<()> {
  match cli.command {
    Commands::List { output } => cmd::cmd_list(console, output).await,
    Commands::Info { output } => cmd::cmd_info(console, config, output).await,
    Commands::Snapshot(command) => cmd::cmd_snapshot(console, command).await,
    Commands::Diff {
      snapshot,
      other,
      all,
      output,
    } => cmd::cmd_diff(console, &snapshot, other.as_deref(), all, output).await,
    Commands::Plan { snapshot, output } => cmd::cmd_plan(console, &snapshot, output).await,
    Commands::Job(command) => cmd::cmd_job(console, command).await,
  }
}
