//! Append-only JSON Lines journal of finished operations.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::OperationStatus;
use crate::package::PackageAction;

use super::types::{JobId, JobKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
  /// RFC 3339.
  pub timestamp: String,
  pub job_id: JobId,
  pub kind: JobKind,
  pub action: PackageAction,
  pub package: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  pub outcome: OperationStatus,
  pub exit_code: Option<i32>,
  pub interpreter: String,
}

#[derive(Debug, Clone)]
pub struct AuditJournal {
  path: PathBuf,
}

impl AuditJournal {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Append one record as a single line.
  ///
  /// Blocking; called once per finished operation.
  pub fn append(&self, record: &AuditRecord) -> io::Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record).map_err(io::Error::other)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
    file.write_all(line.as_bytes())
  }

  /// Read every record back. Malformed lines are skipped.
  pub fn read_all(&self) -> io::Result<Vec<AuditRecord>> {
    let text = match fs::read_to_string(&self.path) {
      Ok(text) => text,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e),
    };
    Ok(text.lines().filter_map(|l| serde_json::from_str(l).ok()).collect())
  }
}
