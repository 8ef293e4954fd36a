//! Restore planning.
//!
//! Turns a diff into the ordered operations that converge the live
//! environment on a snapshot. Planning never executes anything.

use serde::{Deserialize, Serialize};

use crate::package::{AtomicPackageOperation, InventorySet};
use crate::snapshot::{PackageDiff, Snapshot, SnapshotMetadata, diff};

/// Operations for a single restore, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePlan {
  pub snapshot_id: String,
  pub operations: Vec<AtomicPackageOperation>,
}

impl RestorePlan {
  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}

/// Everything shown before a restore is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePreview {
  pub snapshot: SnapshotMetadata,
  pub diff: PackageDiff,
  pub plan: RestorePlan,
  /// One shell command per planned operation.
  pub commands: Vec<String>,
  /// Snapshot requirements that restore cannot reproduce.
  pub unpinned_count: usize,
}

/// Order a diff into operations.
///
/// All uninstalls run before any install, and each group is sorted by
/// normalized name. Added and changed packages are both installed at the
/// target's pinned version.
pub fn plan_operations(diff: &PackageDiff) -> Vec<AtomicPackageOperation> {
  let mut uninstalls: Vec<_> = diff.removed.iter().map(|r| (r.key(), r.name.clone())).collect();
  uninstalls.sort();

  let mut installs: Vec<_> = diff
    .added
    .iter()
    .map(|r| (r.key(), r.name.clone(), r.version.clone()))
    .chain(
      diff
        .changed
        .iter()
        .map(|c| (c.key(), c.name.clone(), c.new_version.clone())),
    )
    .collect();
  installs.sort();

  uninstalls
    .into_iter()
    .map(|(_, name)| AtomicPackageOperation::uninstall(name))
    .chain(
      installs
        .into_iter()
        .map(|(_, name, version)| AtomicPackageOperation::install(name, Some(version))),
    )
    .collect()
}

/// Plan converging `current` on `target`.
pub fn plan_restore(current: &InventorySet, target: &Snapshot) -> RestorePlan {
  RestorePlan {
    snapshot_id: target.id.clone(),
    operations: plan_operations(&diff(current, &target.packages)),
  }
}

/// Diff, plan and the equivalent commands for `python`.
pub fn preview_restore(current: &InventorySet, target: &Snapshot, python: &str) -> RestorePreview {
  let diff = diff(current, &target.packages);
  let plan = RestorePlan {
    snapshot_id: target.id.clone(),
    operations: plan_operations(&diff),
  };
  let commands = plan.operations.iter().map(|op| op.command_line(python)).collect();

  RestorePreview {
    snapshot: target.metadata(),
    diff,
    plan,
    commands,
    unpinned_count: target.unpinned.len(),
  }
}
