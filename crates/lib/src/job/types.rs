use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::environment::OutputStream;
use crate::package::AtomicPackageOperation;
use crate::util::clock::timestamp_id;

#[derive(Debug, Error)]
pub enum JobError {
  #[error("job not found: {0}")]
  NotFound(JobId),

  #[error("job queue is full ({capacity} waiting)")]
  QueueFull { capacity: usize },

  #[error("job {id} is already {status}")]
  NotCancellable { id: JobId, status: JobStatus },

  #[error("job has no operations")]
  EmptyJob,

  #[error("job executor is not running")]
  ExecutorStopped,
}

/// Identifier of a job, unique within one process run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
  pub fn generate() -> Self {
    JobId(format!("job-{}", timestamp_id()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for JobId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for JobId {
  fn from(id: &str) -> Self {
    JobId(id.to_string())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
  Install,
  Uninstall,
  Upgrade,
  BatchRestore,
}

impl JobKind {
  pub fn as_str(self) -> &'static str {
    match self {
      JobKind::Install => "install",
      JobKind::Uninstall => "uninstall",
      JobKind::Upgrade => "upgrade",
      JobKind::BatchRestore => "batch-restore",
    }
  }
}

impl fmt::Display for JobKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// `queued -> running -> {succeeded, failed, cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  Queued,
  Running,
  Succeeded,
  Failed,
  Cancelled,
}

impl JobStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      JobStatus::Queued => "queued",
      JobStatus::Running => "running",
      JobStatus::Succeeded => "succeeded",
      JobStatus::Failed => "failed",
      JobStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One line of job output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
  /// Index into the job's operations; `None` for job-level annotations.
  pub operation: Option<usize>,
  pub stream: OutputStream,
  pub text: String,
}

/// Why a job ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
  pub operation_index: usize,
  pub operation: AtomicPackageOperation,
  pub exit_code: Option<i32>,
  pub reason: String,
  /// Last lines the failing subprocess printed.
  pub output: Vec<String>,
}

impl fmt::Display for JobFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.reason)?;
    for line in &self.output {
      write!(f, "\n  {line}")?;
    }
    Ok(())
  }
}

/// A tracked unit of mutating work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
  pub id: JobId,
  pub kind: JobKind,
  pub operations: Vec<AtomicPackageOperation>,
  pub status: JobStatus,
  pub output: Vec<OutputLine>,
  /// Unix seconds.
  pub submitted_at: u64,
  pub started_at: Option<u64>,
  pub ended_at: Option<u64>,
  /// Number of operations that finished successfully.
  pub completed_operations: usize,
  pub failure: Option<JobFailure>,
}

impl Job {
  pub(crate) fn new(kind: JobKind, operations: Vec<AtomicPackageOperation>, submitted_at: u64) -> Self {
    Self {
      id: JobId::generate(),
      kind,
      operations,
      status: JobStatus::Queued,
      output: Vec::new(),
      submitted_at,
      started_at: None,
      ended_at: None,
      completed_operations: 0,
      failure: None,
    }
  }
}

/// Output appended since a polling position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChunk {
  pub lines: Vec<OutputLine>,
  /// Position to pass on the next poll.
  pub next: usize,
  pub status: JobStatus,
}
