//! Snapshot storage for pkgsnap.
//!
//! Handles reading and writing snapshot records on disk.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/snapshots/
//! └── <id>.txt            # One self-describing record per snapshot
//! ```
//!
//! There is no index file: the directory listing is the index, so a record
//! copied in or deleted by hand is picked up without repair. A record is
//! only valid under the file name matching its `id` header.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::environment::PackageEnvironment;
use crate::inventory::Inventory;
use crate::util::clock::{now_secs, timestamp_id};

use super::record::{parse, render};
use super::types::{Snapshot, SnapshotError, SnapshotMetadata, sanitize_field};

/// Record file extension.
const RECORD_EXTENSION: &str = "txt";

/// Interpreter tag recorded when the interpreter cannot describe itself.
const UNKNOWN_INTERPRETER: &str = "unknown";

/// Attempts at finding an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 5;

/// Manages snapshot storage on disk.
///
/// Records are written atomically and never overwritten.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  /// Base path for snapshot storage (e.g., `~/.local/share/pkgsnap/snapshots`).
  base_path: PathBuf,
}

impl SnapshotStore {
  /// Create a new snapshot store at the given base path.
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  /// Get the path to a snapshot record by ID.
  ///
  /// Ids that could escape the store directory resolve to nothing.
  fn snapshot_path(&self, id: &str) -> Option<PathBuf> {
    is_valid_id(id).then(|| self.base_path.join(format!("{id}.{RECORD_EXTENSION}")))
  }

  /// Ensure the snapshots directory exists.
  fn ensure_dir(&self) -> Result<(), SnapshotError> {
    fs::create_dir_all(&self.base_path).map_err(SnapshotError::CreateDir)
  }

  /// Freeze the live inventory into a new snapshot.
  ///
  /// Always refreshes the inventory first, so the record reflects the
  /// environment at this moment rather than a stale cache. Requirements the
  /// environment cannot pin are kept verbatim in `unpinned`.
  pub async fn save<E: PackageEnvironment>(
    &self,
    inventory: &Inventory<E>,
    label: Option<&str>,
    comment: Option<&str>,
  ) -> Result<Snapshot, SnapshotError> {
    let frozen = inventory.freeze().await?;

    let interpreter = match inventory.environment().interpreter_info().await {
      Ok(info) => sanitize_field(Some(&info)).unwrap_or_else(|| UNKNOWN_INTERPRETER.to_string()),
      Err(e) => {
        warn!(error = %e, "could not describe interpreter");
        UNKNOWN_INTERPRETER.to_string()
      }
    };

    let mut snapshot = Snapshot {
      id: timestamp_id(),
      label: sanitize_field(label),
      comment: sanitize_field(comment),
      created_at: now_secs(),
      interpreter,
      packages: frozen.packages,
      unpinned: frozen.unpinned,
    };

    let mut attempts = 1;
    loop {
      match self.save_snapshot(&snapshot) {
        Err(SnapshotError::AlreadyExists(id)) if attempts < MAX_ID_ATTEMPTS => {
          debug!(snapshot_id = %id, "snapshot id taken, regenerating");
          snapshot.id = timestamp_id();
          attempts += 1;
        }
        result => break result?,
      }
    }

    info!(
      snapshot_id = %snapshot.id,
      packages = snapshot.packages.len(),
      label = snapshot.label.as_deref().unwrap_or(""),
      "snapshot saved"
    );
    Ok(snapshot)
  }

  /// Write a snapshot record.
  ///
  /// The record is written to a temporary file in the store directory and
  /// moved into place without replacing an existing record.
  pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let path = self
      .snapshot_path(&snapshot.id)
      .ok_or_else(|| SnapshotError::InvalidId(snapshot.id.clone()))?;
    self.ensure_dir()?;

    if path.exists() {
      return Err(SnapshotError::AlreadyExists(snapshot.id.clone()));
    }

    let mut temp = tempfile::NamedTempFile::new_in(&self.base_path).map_err(SnapshotError::Write)?;
    temp
      .write_all(render(snapshot).as_bytes())
      .map_err(SnapshotError::Write)?;
    temp.as_file().sync_all().map_err(SnapshotError::Write)?;

    temp.persist_noclobber(&path).map_err(|e| {
      if e.error.kind() == io::ErrorKind::AlreadyExists {
        SnapshotError::AlreadyExists(snapshot.id.clone())
      } else {
        SnapshotError::Write(e.error)
      }
    })?;

    debug!(snapshot_id = %snapshot.id, path = %path.display(), "snapshot record written");
    Ok(())
  }

  /// Load a snapshot by ID.
  pub fn load_snapshot(&self, id: &str) -> Result<Snapshot, SnapshotError> {
    let path = self
      .snapshot_path(id)
      .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;

    let content = fs::read_to_string(&path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        SnapshotError::NotFound(id.to_string())
      } else {
        SnapshotError::Read(e)
      }
    })?;

    let snapshot = parse(&path, &content)?;
    if snapshot.id != id {
      return Err(SnapshotError::Parse {
        path,
        line: 1,
        message: format!("record id {:?} does not match file name", snapshot.id),
      });
    }
    Ok(snapshot)
  }

  /// List all snapshots, most recent first.
  ///
  /// Records that cannot be read or parsed are skipped with a warning.
  pub fn list(&self) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    let entries = match fs::read_dir(&self.base_path) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(SnapshotError::Read(e)),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
      let path = entry.map_err(SnapshotError::Read)?.path();
      if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
        continue;
      }
      let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };

      match self.load_snapshot(id) {
        Ok(snapshot) => snapshots.push(snapshot.metadata()),
        Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot record"),
      }
    }

    snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    Ok(snapshots)
  }

  /// Delete a snapshot by ID.
  ///
  /// Fails with [`SnapshotError::NotFound`] when no such record exists.
  pub fn delete_snapshot(&self, id: &str) -> Result<(), SnapshotError> {
    let path = self
      .snapshot_path(id)
      .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;

    match fs::remove_file(&path) {
      Ok(()) => {
        info!(snapshot_id = %id, "snapshot deleted");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SnapshotError::NotFound(id.to_string())),
      Err(e) => Err(SnapshotError::Write(e)),
    }
  }
}

/// Snapshot ids are plain file stems.
fn is_valid_id(id: &str) -> bool {
  !id.is_empty()
    && !id.starts_with('.')
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
