use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::environment::EnvironmentError;
use crate::package::InventorySet;
use crate::util::hash::{ContentHash, hash_lines};

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("snapshot not found: {0}")]
  NotFound(String),

  #[error("snapshot already exists: {0}")]
  AlreadyExists(String),

  #[error("invalid snapshot id: {0:?}")]
  InvalidId(String),

  #[error("failed to read snapshot: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write snapshot: {0}")]
  Write(#[source] io::Error),

  #[error("failed to create snapshot directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("{}:{line}: {message}", path.display())]
  Parse { path: PathBuf, line: usize, message: String },

  #[error("snapshot {id} is corrupt: digest {actual} does not match recorded {recorded}")]
  DigestMismatch {
    id: String,
    recorded: String,
    actual: String,
  },

  #[error(transparent)]
  Environment(#[from] EnvironmentError),
}

/// An immutable, point-in-time record of the installed package set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub id: String,

  /// User-supplied short name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,

  /// Free-text note.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,

  /// Unix seconds.
  pub created_at: u64,

  /// Interpreter implementation, version and platform tag.
  pub interpreter: String,

  pub packages: InventorySet,

  /// Requirement lines with no `==` pin (editables, direct references), kept verbatim.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub unpinned: Vec<String>,
}

impl Snapshot {
  /// Content digest over the pinned package lines.
  pub fn digest(&self) -> ContentHash {
    let lines = self.packages.requirement_lines();
    hash_lines(lines.iter().map(String::as_str))
  }

  pub fn metadata(&self) -> SnapshotMetadata {
    SnapshotMetadata {
      id: self.id.clone(),
      label: self.label.clone(),
      comment: self.comment.clone(),
      created_at: self.created_at,
      interpreter: self.interpreter.clone(),
      package_count: self.packages.len(),
      unpinned_count: self.unpinned.len(),
      digest: self.digest().to_string(),
    }
  }
}

/// Lightweight listing entry for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub created_at: u64,
  pub interpreter: String,
  pub package_count: usize,
  pub unpinned_count: usize,
  pub digest: String,
}

/// Collapse a user-supplied header value onto one line; blank becomes `None`.
pub fn sanitize_field(value: Option<&str>) -> Option<String> {
  let value = value?;
  let single: String = value
    .split(['\r', '\n'])
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
  (!single.is_empty()).then_some(single)
}
