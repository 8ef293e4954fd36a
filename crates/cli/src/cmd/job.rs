//! Commands that mutate the environment.
//!
//! Each one submits a job to the executor and follows its output until the
//! job reaches a terminal state. Ctrl-C requests cancellation of the job.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use tracing::debug;

use pkgsnap_lib::job::{Job, JobStatus};

use crate::cmd::Console;
use crate::output::{format_duration, print_info, print_job_line, print_success, print_warning};
use crate::prompts::confirm;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum JobCommand {
  /// Converge the environment on a snapshot
  Restore {
    /// Snapshot to restore
    snapshot: String,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },

  /// Install a package
  Install {
    /// Package name
    package: String,

    /// Exact version to install (default: latest)
    #[arg(long)]
    version: Option<String>,
  },

  /// Uninstall packages
  Uninstall {
    /// Package names
    #[arg(required = true)]
    packages: Vec<String>,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },

  /// Upgrade a package to the latest available version
  Upgrade {
    /// Package name
    package: String,
  },
}

pub async fn cmd_job(console: &Console, command: JobCommand) -> Result<()> {
  let job = match command {
    JobCommand::Restore { snapshot, force } => match submit_restore(console, &snapshot, force).await? {
      Some(job) => job,
      None => return Ok(()),
    },
    JobCommand::Install { package, version } => console.install(&package, version.as_deref())?,
    JobCommand::Uninstall { packages, force } => {
      if !confirm(&format!("Uninstall {}?", packages.join(", ")), force)? {
        print_info("Cancelled");
        return Ok(());
      }
      console.uninstall(packages.as_slice())?
    }
    JobCommand::Upgrade { package } => console.upgrade(&package)?,
  };

  follow(console, job).await
}

async fn submit_restore(console: &Console, snapshot: &str, force: bool) -> Result<Option<Job>> {
  let preview = console
    .preview_restore(snapshot)
    .await
    .with_context(|| format!("Failed to plan restore of {}", snapshot))?;

  if preview.plan.is_empty() {
    print_info("Environment already matches snapshot; nothing to do");
    return Ok(None);
  }

  println!("Restoring {} will run:", preview.snapshot.id);
  for command in &preview.commands {
    println!("  {}", command);
  }

  if !confirm(&format!("Run {} operation(s)?", preview.plan.operations.len()), force)? {
    print_info("Cancelled");
    return Ok(None);
  }

  Ok(Some(console.restore(snapshot).await?))
}

/// Stream a job's output until it finishes.
async fn follow(console: &Console, job: Job) -> Result<()> {
  let started = Instant::now();
  let mut position = 0;
  let mut interrupted = false;

  let ctrl_c = tokio::signal::ctrl_c();
  tokio::pin!(ctrl_c);

  loop {
    let chunk = console.job_output_since(&job.id, position)?;
    for line in &chunk.lines {
      print_job_line(line);
    }
    position = chunk.next;
    if chunk.status.is_terminal() {
      break;
    }

    tokio::select! {
      _ = tokio::time::sleep(POLL_INTERVAL) => {}
      signal = &mut ctrl_c, if !interrupted => {
        signal.context("Failed to listen for Ctrl-C")?;
        interrupted = true;
        print_warning("Cancelling job...");
        if let Err(e) = console.cancel_job(&job.id) {
          debug!(job_id = %job.id, error = %e, "cancel request rejected");
        }
      }
    }
  }

  let job = console.job_status(&job.id)?;
  match job.status {
    JobStatus::Succeeded => {
      print_success(&format!(
        "Job {} {} succeeded ({} operation(s) in {})",
        job.id,
        job.kind,
        job.completed_operations,
        format_duration(started.elapsed())
      ));
      Ok(())
    }
    JobStatus::Failed => match &job.failure {
      Some(failure) => bail!(
        "Job {} failed after {} of {} operation(s): {}",
        job.id,
        job.completed_operations,
        job.operations.len(),
        failure.reason
      ),
      None => bail!("Job {} failed", job.id),
    },
    JobStatus::Cancelled => bail!(
      "Job {} cancelled after {} of {} operation(s)",
      job.id,
      job.completed_operations,
      job.operations.len()
    ),
    JobStatus::Queued | JobStatus::Running => bail!("Job {} did not finish", job.id),
  }
}
