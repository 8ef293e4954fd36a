//! On-disk snapshot record.
//!
//! A record is a plain requirements file with a commented metadata block, so
//! `pip install -r <id>.txt` works on it directly:
//!
//! ```text
//! # pkgsnap snapshot
//! # id: 20261016T101500123Z
//! # label: before-upgrade
//! # created_at: 2026-10-16T10:15:00Z
//! # interpreter: CPython 3.12.1 (linux, venv)
//! # digest: 3f5a...
//! Django==5.0.1
//! requests==2.31.0
//! # unpinned
//! # -e git+https://example.invalid/proj.git#egg=proj
//! ```

use std::fmt::Write as _;
use std::path::Path;

use crate::package::{InventorySet, parse_pin};
use crate::util::clock::{format_timestamp, parse_timestamp};

use super::types::{Snapshot, SnapshotError};

pub const RECORD_MAGIC: &str = "# pkgsnap snapshot";
const UNPINNED_MARKER: &str = "# unpinned";

/// Render a snapshot as record text.
pub fn render(snapshot: &Snapshot) -> String {
  let mut out = String::new();
  out.push_str(RECORD_MAGIC);
  out.push('\n');

  let _ = writeln!(out, "# id: {}", snapshot.id);
  if let Some(label) = &snapshot.label {
    let _ = writeln!(out, "# label: {label}");
  }
  if let Some(comment) = &snapshot.comment {
    let _ = writeln!(out, "# comment: {comment}");
  }
  let _ = writeln!(out, "# created_at: {}", format_timestamp(snapshot.created_at));
  let _ = writeln!(out, "# interpreter: {}", snapshot.interpreter);
  let _ = writeln!(out, "# digest: {}", snapshot.digest());

  for line in snapshot.packages.requirement_lines() {
    out.push_str(&line);
    out.push('\n');
  }

  if !snapshot.unpinned.is_empty() {
    out.push_str(UNPINNED_MARKER);
    out.push('\n');
    for line in &snapshot.unpinned {
      let _ = writeln!(out, "# {line}");
    }
  }

  out
}

#[derive(Default)]
struct Header {
  id: Option<String>,
  label: Option<String>,
  comment: Option<String>,
  created_at: Option<u64>,
  interpreter: Option<String>,
  digest: Option<String>,
}

/// Parse record text written by [`render`], verifying its digest.
///
/// `path` is only used to locate errors.
pub fn parse(path: &Path, text: &str) -> Result<Snapshot, SnapshotError> {
  let error = |line: usize, message: String| SnapshotError::Parse {
    path: path.to_path_buf(),
    line,
    message,
  };

  let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

  match lines.next() {
    Some((_, first)) if first.trim_end() == RECORD_MAGIC => {}
    _ => return Err(error(1, format!("missing `{RECORD_MAGIC}` header"))),
  }

  let mut header = Header::default();
  let mut packages = InventorySet::new();
  let mut unpinned = Vec::new();
  let mut in_unpinned = false;
  let mut in_header = true;

  for (number, line) in lines {
    if line.trim().is_empty() {
      continue;
    }

    if in_unpinned {
      let entry = line
        .strip_prefix("# ")
        .ok_or_else(|| error(number, "expected commented unpinned requirement".into()))?;
      unpinned.push(entry.to_string());
      continue;
    }

    if line.trim_end() == UNPINNED_MARKER {
      in_unpinned = true;
      in_header = false;
      continue;
    }

    if let Some(comment) = line.strip_prefix('#') {
      if in_header && let Some((key, value)) = comment.trim().split_once(':') {
        let value = value.trim().to_string();
        match key.trim() {
          "id" => header.id = Some(value),
          "label" => header.label = Some(value),
          "comment" => header.comment = Some(value),
          "created_at" => {
            let secs = parse_timestamp(&value).ok_or_else(|| error(number, format!("invalid timestamp {value:?}")))?;
            header.created_at = Some(secs);
          }
          "interpreter" => header.interpreter = Some(value),
          "digest" => header.digest = Some(value),
          _ => {}
        }
      }
      continue;
    }

    in_header = false;
    let record = parse_pin(line).ok_or_else(|| error(number, format!("expected `name==version`, found {line:?}")))?;
    if let Some(previous) = packages.insert(record) {
      return Err(error(number, format!("duplicate package {}", previous.name)));
    }
  }

  let id = header.id.ok_or_else(|| error(1, "missing `id` header".into()))?;
  let created_at = header
    .created_at
    .ok_or_else(|| error(1, "missing `created_at` header".into()))?;
  let recorded = header.digest.ok_or_else(|| error(1, "missing `digest` header".into()))?;

  let snapshot = Snapshot {
    id,
    label: header.label,
    comment: header.comment,
    created_at,
    interpreter: header.interpreter.unwrap_or_default(),
    packages,
    unpinned,
  };

  let actual = snapshot.digest().to_string();
  if actual != recorded {
    return Err(SnapshotError::DigestMismatch {
      id: snapshot.id,
      recorded,
      actual,
    });
  }

  Ok(snapshot)
}
