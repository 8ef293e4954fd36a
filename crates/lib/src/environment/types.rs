use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum EnvironmentError {
  /// The interpreter or its package tool cannot be used.
  #[error("environment unavailable ({python}): {reason}")]
  Unavailable { python: PathBuf, reason: String },

  #[error("failed to start {program}: {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unexpected package listing: {0}")]
  InvalidListing(String),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
  Stdout,
  Stderr,
  /// Annotations added by this crate rather than the subprocess.
  System,
}

impl OutputStream {
  pub fn as_str(self) -> &'static str {
    match self {
      OutputStream::Stdout => "stdout",
      OutputStream::Stderr => "stderr",
      OutputStream::System => "system",
    }
  }
}

/// Receives subprocess output line by line.
pub trait OutputSink: Send + Sync {
  fn line(&self, stream: OutputStream, text: String);
}

/// Discards everything.
impl OutputSink for () {
  fn line(&self, _stream: OutputStream, _text: String) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
  Succeeded,
  Failed,
  Cancelled,
  TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
  pub status: OperationStatus,
  pub exit_code: Option<i32>,
  /// Set when the operation was force-terminated by its wall-clock limit.
  pub timeout: Option<Duration>,
}

impl OperationOutcome {
  pub fn exited(code: Option<i32>, success: bool) -> Self {
    Self {
      status: if success {
        OperationStatus::Succeeded
      } else {
        OperationStatus::Failed
      },
      exit_code: code,
      timeout: None,
    }
  }

  pub fn succeeded() -> Self {
    Self::exited(Some(0), true)
  }

  pub fn failed(code: i32) -> Self {
    Self::exited(Some(code), false)
  }

  pub fn cancelled() -> Self {
    Self {
      status: OperationStatus::Cancelled,
      exit_code: None,
      timeout: None,
    }
  }

  pub fn timed_out(limit: Duration) -> Self {
    Self {
      status: OperationStatus::TimedOut,
      exit_code: None,
      timeout: Some(limit),
    }
  }
}

/// Requests cancellation of a running job.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
  pub fn cancel(&self) {
    self.0.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.0.borrow()
  }

  pub fn subscribe(&self) -> Cancellation {
    Cancellation(self.0.subscribe())
  }
}

/// Observes a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Cancellation {
  pub fn new() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), Cancellation(rx))
  }

  /// A signal that never fires.
  pub fn never() -> Cancellation {
    Cancellation::new().1
  }

  pub fn is_cancelled(&self) -> bool {
    *self.0.borrow()
  }

  /// Resolves once cancellation is requested. Never resolves if the handle is dropped first.
  pub async fn cancelled(&mut self) {
    if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}
