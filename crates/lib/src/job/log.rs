//! Per-job output log on disk.
//!
//! ```text
//! # job job-20261016T101500123Z kind=batch-restore operations=3
//! [1/3] system: ==> uninstall B
//! [1/3] stdout: Successfully uninstalled B-1.0
//! [1/3] system: <== succeeded
//! [-/3] system: post-check: inventory refreshed (41 packages)
//! # status: succeeded
//! ```
//!
//! Every record is written with a single `write_all`, so a crash mid-job leaves
//! a truncated log whose lines are all complete.
//!
//! Writes are synchronous and flushed per record, on the executor's worker
//! task. Installer output is line-rate, so this stays off `spawn_blocking`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::environment::OutputStream;

use super::types::{JobId, JobKind, JobStatus};

pub struct JobLog {
  path: PathBuf,
  file: Mutex<File>,
  operations: usize,
}

impl JobLog {
  /// Open `dir/<id>.log` for appending and write the header.
  pub fn create(dir: &Path, id: &JobId, kind: JobKind, operations: usize) -> io::Result<Self> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{id}.log"));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let log = Self {
      path,
      file: Mutex::new(file),
      operations,
    };
    log.write(&format!("# job {id} kind={kind} operations={operations}"));
    Ok(log)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn line(&self, operation: Option<usize>, stream: OutputStream, text: &str) {
    let position = match operation {
      Some(index) => (index + 1).to_string(),
      None => "-".to_string(),
    };
    self.write(&format!("[{position}/{}] {}: {text}", self.operations, stream.as_str()));
  }

  pub fn finish(&self, status: JobStatus) {
    self.write(&format!("# status: {status}"));
  }

  fn write(&self, record: &str) {
    let mut line = String::with_capacity(record.len() + 1);
    line.push_str(record);
    line.push('\n');

    let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
      warn!(path = %self.path.display(), error = %e, "failed to write job log");
    }
  }
}
