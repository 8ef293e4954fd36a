//! `python -m pip` backed environment.

use std::future::pending;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::package::{
  AtomicPackageOperation, InventorySet, PackageAction, PackageRecord, ParsedRequirements, parse_requirements,
};

use super::PackageEnvironment;
use super::types::{Cancellation, EnvironmentError, OperationOutcome, OutputSink, OutputStream};

/// Prints `CPython 3.12.1 (linux, venv)`.
const INTERPRETER_PROBE: &str = "import platform, sys; \
mode = 'venv' if sys.prefix != getattr(sys, 'base_prefix', sys.prefix) else 'system'; \
print(f'{platform.python_implementation()} {platform.python_version()} ({sys.platform}, {mode})')";

const PIP_QUIET_FLAGS: [&str; 2] = ["--disable-pip-version-check", "--no-input"];

#[derive(Debug, Deserialize)]
struct ListedPackage {
  name: String,
  version: String,
}

/// Drives the interpreter's own `pip` module.
#[derive(Debug, Clone)]
pub struct PipEnvironment {
  python: PathBuf,
  timeout: Option<Duration>,
}

impl PipEnvironment {
  pub fn new(python: impl Into<PathBuf>) -> Self {
    Self {
      python: python.into(),
      timeout: None,
    }
  }

  /// Force-terminate any operation running longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  fn unavailable(&self, reason: impl Into<String>) -> EnvironmentError {
    EnvironmentError::Unavailable {
      python: self.python.clone(),
      reason: reason.into(),
    }
  }

  /// Run a short query command and return its stdout.
  async fn query(&self, args: &[&str]) -> Result<String, EnvironmentError> {
    debug!(python = %self.python.display(), ?args, "querying interpreter");

    let output = Command::new(&self.python)
      .args(args)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|e| self.unavailable(format!("failed to start interpreter: {e}")))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      let detail = if stderr.is_empty() {
        format!("exit status {:?}", output.status.code())
      } else {
        stderr
      };
      return Err(self.unavailable(detail));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

/// Arguments passed to the interpreter for one operation.
pub fn pip_args(op: &AtomicPackageOperation) -> Vec<String> {
  let mut args: Vec<String> = vec!["-m".into(), "pip".into(), op.action.as_str().into()];
  args.extend(PIP_QUIET_FLAGS.iter().map(|s| s.to_string()));
  match op.action {
    PackageAction::Install => {
      if op.version.is_none() {
        args.push("--upgrade".into());
      }
      args.push(op.target());
    }
    PackageAction::Uninstall => {
      args.push("-y".into());
      args.push(op.name.clone());
    }
  }
  args
}

fn parse_listing(stdout: &str) -> Result<InventorySet, EnvironmentError> {
  let listed: Vec<ListedPackage> =
    serde_json::from_str(stdout.trim()).map_err(|e| EnvironmentError::InvalidListing(e.to_string()))?;
  Ok(listed.into_iter().map(|p| PackageRecord::new(p.name, p.version)).collect())
}

impl PackageEnvironment for PipEnvironment {
  async fn list_installed(&self) -> Result<InventorySet, EnvironmentError> {
    let stdout = self
      .query(&["-m", "pip", "list", "--format=json", "--disable-pip-version-check"])
      .await?;
    let set = parse_listing(&stdout)?;
    debug!(count = set.len(), "listed installed packages");
    Ok(set)
  }

  async fn freeze(&self) -> Result<ParsedRequirements, EnvironmentError> {
    let stdout = self.query(&["-m", "pip", "freeze", "--disable-pip-version-check"]).await?;
    let parsed = parse_requirements(&stdout);
    debug!(
      pinned = parsed.packages.len(),
      unpinned = parsed.unpinned.len(),
      "froze installed packages"
    );
    Ok(parsed)
  }

  async fn interpreter_info(&self) -> Result<String, EnvironmentError> {
    let stdout = self.query(&["-c", INTERPRETER_PROBE]).await?;
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
  }

  async fn run_operation(
    &self,
    op: &AtomicPackageOperation,
    sink: &dyn OutputSink,
    mut cancel: Cancellation,
  ) -> Result<OperationOutcome, EnvironmentError> {
    let args = pip_args(op);
    info!(op = %op, "running package operation");
    debug!(python = %self.python.display(), ?args, "spawning process");

    let mut child = Command::new(&self.python)
      .args(&args)
      .env("PYTHONUNBUFFERED", "1")
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| EnvironmentError::Spawn {
        program: self.python.clone(),
        source,
      })?;

    let stdout = child.stdout.take().ok_or_else(|| self.unavailable("stdout not captured"))?;
    let stderr = child.stderr.take().ok_or_else(|| self.unavailable("stderr not captured"))?;
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_open = true;
    let mut stderr_open = true;

    let limit = self.timeout;
    let deadline = async move {
      match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => pending::<()>().await,
      }
    };
    tokio::pin!(deadline);

    loop {
      tokio::select! {
        line = stdout_lines.next_line(), if stdout_open => match line {
          Ok(Some(text)) => sink.line(OutputStream::Stdout, text),
          Ok(None) => stdout_open = false,
          Err(e) => {
            warn!(error = %e, "failed reading stdout");
            stdout_open = false;
          }
        },
        line = stderr_lines.next_line(), if stderr_open => match line {
          Ok(Some(text)) => sink.line(OutputStream::Stderr, text),
          Ok(None) => stderr_open = false,
          Err(e) => {
            warn!(error = %e, "failed reading stderr");
            stderr_open = false;
          }
        },
        status = child.wait(), if !stdout_open && !stderr_open => {
          let status = status?;
          debug!(op = %op, code = ?status.code(), "process exited");
          return Ok(OperationOutcome::exited(status.code(), status.success()));
        }
        _ = cancel.cancelled() => {
          warn!(op = %op, "terminating process on cancellation");
          if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to terminate process");
          }
          sink.line(OutputStream::System, "process terminated: cancellation requested".into());
          return Ok(OperationOutcome::cancelled());
        }
        _ = &mut deadline => {
          let limit = limit.unwrap_or_default();
          warn!(op = %op, timeout = ?limit, "terminating process on timeout");
          if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to terminate process");
          }
          sink.line(
            OutputStream::System,
            format!("process terminated: exceeded {}", humantime::format_duration(limit)),
          );
          return Ok(OperationOutcome::timed_out(limit));
        }
      }
    }
  }
}
